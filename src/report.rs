use std::io;
use std::path::Path;

use crate::statistics::Statistics;

/// One `KEY = count` line per answer choice, in table order.
pub fn format_report(statistics: &Statistics) -> String {
    statistics
        .iter()
        .map(|(key, count)| format!("{} = {}\n", key, count))
        .collect()
}

pub fn write_report(path: &Path, statistics: &Statistics) -> io::Result<()> {
    std::fs::write(path, format_report(statistics))
}
