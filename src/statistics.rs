use std::collections::HashSet;

use image::GrayImage;
use thiserror::Error;

use crate::{
    classify::{Classification, ClassifyError, ClassifyOptions},
    marks::{score_marks, ScoredMark},
    types::{AnswerChoiceKey, CoordinateMap},
};

/// Likert-scale labels, from "strongly agree" to "strongly disagree".
pub const DEFAULT_ANSWER_CHOICES: [&str; 7] = ["SA", "A", "SLA", "NAD", "SLD", "D", "SD"];

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("row {row} has {points} bubbles but only {choices} answer choices are defined")]
    RowTooLong {
        /// 1-based, matching the line order of the coordinates file.
        row: usize,
        points: usize,
        choices: usize,
    },

    #[error("at least one answer choice is required")]
    NoAnswerChoices,

    #[error("answer choice {0} is listed more than once")]
    DuplicateAnswerChoice(AnswerChoiceKey),
}

/// Maps a bubble's position within its row to the answer choice it stands
/// for: position `i` is the `i`th key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKeyTable {
    keys: Vec<AnswerChoiceKey>,
}

impl Default for AnswerKeyTable {
    fn default() -> Self {
        Self {
            keys: DEFAULT_ANSWER_CHOICES
                .iter()
                .map(|&key| AnswerChoiceKey::from(key))
                .collect(),
        }
    }
}

impl AnswerKeyTable {
    pub fn new(keys: Vec<AnswerChoiceKey>) -> Result<Self, ScoreError> {
        if keys.is_empty() {
            return Err(ScoreError::NoAnswerChoices);
        }

        let mut seen = HashSet::new();
        for key in &keys {
            if !seen.insert(key) {
                return Err(ScoreError::DuplicateAnswerChoice(key.clone()));
            }
        }

        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn key_at(&self, position: usize) -> Option<&AnswerChoiceKey> {
        self.keys.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnswerChoiceKey> {
        self.keys.iter()
    }

    /// Ensures every row of `coordinate_map` has a key for each of its bubbles.
    pub fn validate(&self, coordinate_map: &CoordinateMap) -> Result<(), ScoreError> {
        match coordinate_map
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() > self.len())
        {
            Some((row, points)) => Err(self.row_too_long(row, points.len())),
            None => Ok(()),
        }
    }

    pub(crate) fn row_too_long(&self, row: usize, points: usize) -> ScoreError {
        ScoreError::RowTooLong {
            row: row + 1,
            points,
            choices: self.len(),
        }
    }
}

/// Shaded-bubble counts per answer choice for one form.
///
/// Only shaded bubbles count. Crossed-out bubbles are treated as withdrawn
/// answers: they are outlined on the annotated image but add nothing here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statistics {
    counts: Vec<(AnswerChoiceKey, u32)>,
}

impl Statistics {
    /// Every answer choice of `answer_keys` at zero, in table order.
    pub fn new(answer_keys: &AnswerKeyTable) -> Self {
        Self {
            counts: answer_keys.iter().map(|key| (key.clone(), 0)).collect(),
        }
    }

    pub fn from_scored_marks(answer_keys: &AnswerKeyTable, scored_marks: &[ScoredMark]) -> Self {
        let mut statistics = Self::new(answer_keys);
        for scored_mark in scored_marks {
            statistics.record(scored_mark);
        }
        statistics
    }

    fn record(&mut self, scored_mark: &ScoredMark) {
        if scored_mark.classification != Classification::Shaded {
            return;
        }

        if let Some((_, count)) = self
            .counts
            .iter_mut()
            .find(|(key, _)| *key == scored_mark.key)
        {
            *count += 1;
        }
    }

    pub fn count(&self, key: &AnswerChoiceKey) -> Option<u32> {
        self.counts
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
    }

    /// Answer choices and their counts, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&AnswerChoiceKey, u32)> {
        self.counts.iter().map(|(key, count)| (key, *count))
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|(_, count)| count).sum()
    }
}

/// Scores every bubble of `coordinate_map` in `raster` and tallies the shaded
/// ones per answer choice.
pub fn aggregate(
    coordinate_map: &CoordinateMap,
    raster: &GrayImage,
    answer_keys: &AnswerKeyTable,
    options: &ClassifyOptions,
) -> Result<Statistics, ScoreError> {
    let scored_marks = score_marks(raster, coordinate_map, answer_keys, options)?;
    Ok(Statistics::from_scored_marks(answer_keys, &scored_marks))
}
