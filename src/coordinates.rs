use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use logging_timer::time;
use thiserror::Error;

use crate::types::{CoordinateMap, PixelPoint, Row};

#[derive(Debug, Error)]
pub enum CoordinateMapError {
    #[error("coordinates file {0} does not exist")]
    NotFound(PathBuf),

    #[error("unable to read coordinates file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {token:?} is not a valid integer coordinate")]
    InvalidToken { line: usize, token: String },
}

/// Reads and parses a coordinates file. A missing file is reported as
/// [`CoordinateMapError::NotFound`] so callers can abort before touching any
/// images.
#[time]
pub fn load_coordinate_map(
    path: &Path,
    delimiter: char,
) -> Result<CoordinateMap, CoordinateMapError> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CoordinateMapError::NotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(CoordinateMapError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let coordinate_map = parse_coordinate_map(&source, delimiter)?;
    debug!(
        "loaded {} rows ({} points) from {}",
        coordinate_map.len(),
        coordinate_map.iter().map(Vec::len).sum::<usize>(),
        path.display()
    );
    Ok(coordinate_map)
}

/// Parses one row of `(x, y)` points per line of `source`.
///
/// Tokens are separated by `delimiter`; empty tokens from repeated delimiters
/// are skipped. Consecutive values are paired as `x y x y ...`. When a line
/// has an odd number of values the last one cannot form a point and is
/// dropped with a warning. Lines that produce no points produce no row.
pub fn parse_coordinate_map(
    source: &str,
    delimiter: char,
) -> Result<CoordinateMap, CoordinateMapError> {
    let (coordinate_map, unpaired) = parse_coordinates(source, delimiter)?;
    for UnpairedCoordinate { line, value } in unpaired {
        warn!("line {}: dropping unpaired trailing coordinate {}", line, value);
    }
    Ok(coordinate_map)
}

/// A trailing value left over on a line with an odd number of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpairedCoordinate {
    /// 1-based line number.
    pub line: usize,
    pub value: i32,
}

/// Parses the map and also returns every value dropped for lacking a partner.
pub fn parse_coordinates(
    source: &str,
    delimiter: char,
) -> Result<(CoordinateMap, Vec<UnpairedCoordinate>), CoordinateMapError> {
    let mut coordinate_map = CoordinateMap::new();
    let mut unpaired = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let values = parse_line_values(line, delimiter, line_number)?;
        let (row, dropped) = pair_values(&values);

        if let Some(value) = dropped {
            unpaired.push(UnpairedCoordinate {
                line: line_number,
                value,
            });
        }
        if !row.is_empty() {
            coordinate_map.push(row);
        }
    }

    Ok((coordinate_map, unpaired))
}

/// Pairs values in order as `(x, y)`, returning the trailing value of an odd
/// count separately.
fn pair_values(values: &[i32]) -> (Row, Option<i32>) {
    let pairs = values.chunks_exact(2);
    let dropped = pairs.remainder().first().copied();
    let row = pairs
        .map(|pair| PixelPoint::new(pair[0], pair[1]))
        .collect::<Row>();
    (row, dropped)
}

fn parse_line_values(
    line: &str,
    delimiter: char,
    line_number: usize,
) -> Result<Vec<i32>, CoordinateMapError> {
    line.split(delimiter)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<i32>()
                .map_err(|_| CoordinateMapError::InvalidToken {
                    line: line_number,
                    token: token.to_string(),
                })
        })
        .collect()
}
