use image::GrayImage;
use logging_timer::time;

use crate::{
    classify::{classify, Classification, ClassifyOptions},
    statistics::{AnswerKeyTable, ScoreError},
    types::{AnswerChoiceKey, CoordinateMap, PixelPoint},
};

/// A bubble from the coordinate map together with how it was marked.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMark {
    /// Index of the row (form field) in the coordinate map.
    pub row: usize,
    /// Index of the bubble within its row.
    pub column: usize,
    pub key: AnswerChoiceKey,
    pub center: PixelPoint,
    pub classification: Classification,
}

pub type ScoredMarks = Vec<ScoredMark>;

/// Classifies every bubble of `coordinate_map` in a binarized image.
///
/// Fails on the first row with more bubbles than `answer_keys` has labels, or
/// on the first bubble that cannot be classified.
#[time]
pub fn score_marks(
    raster: &GrayImage,
    coordinate_map: &CoordinateMap,
    answer_keys: &AnswerKeyTable,
    options: &ClassifyOptions,
) -> Result<ScoredMarks, ScoreError> {
    answer_keys.validate(coordinate_map)?;

    let mut scored_marks = ScoredMarks::with_capacity(coordinate_map.iter().map(Vec::len).sum());
    for (row, points) in coordinate_map.iter().enumerate() {
        for (column, center) in points.iter().enumerate() {
            let key = answer_keys
                .key_at(column)
                .ok_or_else(|| answer_keys.row_too_long(row, points.len()))?;

            scored_marks.push(ScoredMark {
                row,
                column,
                key: key.clone(),
                center: *center,
                classification: classify(raster, center, options)?,
            });
        }
    }

    Ok(scored_marks)
}
