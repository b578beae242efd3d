use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    classify::{BoundsPolicy, ClassifyOptions, MarkThresholds, DEFAULT_RADIUS},
    statistics::{AnswerKeyTable, ScoreError},
    types::AnswerChoiceKey,
};

/// Layout-independent settings for a paper form, read from JSON. Every field
/// is optional and falls back to the built-in Likert form.
///
/// ```json
/// {
///   "title": "Course evaluation",
///   "answerChoices": ["SA", "A", "SLA", "NAD", "SLD", "D", "SD"],
///   "markThresholds": { "crossedBelow": 69, "shadedBelow": 135 },
///   "radius": 8
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormDefinition {
    pub title: Option<String>,
    pub answer_choices: Option<Vec<AnswerChoiceKey>>,
    pub mark_thresholds: Option<MarkThresholds>,
    pub radius: Option<u32>,
}

#[derive(Debug, Error)]
pub enum FormDefinitionError {
    #[error("unable to read form definition {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse form definition {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    AnswerChoices(#[from] ScoreError),

    #[error("bubble radius must be at least 1")]
    ZeroRadius,
}

pub fn load_form_definition(path: &Path) -> Result<FormDefinition, FormDefinitionError> {
    let json = std::fs::read_to_string(path).map_err(|source| FormDefinitionError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&json).map_err(|source| FormDefinitionError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl FormDefinition {
    pub fn answer_keys(&self) -> Result<AnswerKeyTable, FormDefinitionError> {
        match &self.answer_choices {
            Some(choices) => Ok(AnswerKeyTable::new(choices.clone())?),
            None => Ok(AnswerKeyTable::default()),
        }
    }

    /// Scoring options for this form. `radius` takes precedence over the
    /// form's own radius.
    pub fn classify_options(
        &self,
        radius: Option<u32>,
        bounds_policy: BoundsPolicy,
    ) -> Result<ClassifyOptions, FormDefinitionError> {
        let radius = radius.or(self.radius).unwrap_or(DEFAULT_RADIUS);
        if radius == 0 {
            return Err(FormDefinitionError::ZeroRadius);
        }

        Ok(ClassifyOptions {
            radius,
            thresholds: self.mark_thresholds.unwrap_or_default(),
            bounds_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_definition_uses_defaults() {
        let form: FormDefinition = serde_json::from_str("{}").unwrap();
        assert_eq!(form, FormDefinition::default());
        assert_eq!(form.answer_keys().unwrap(), AnswerKeyTable::default());
        assert_eq!(
            form.classify_options(None, BoundsPolicy::Clip).unwrap(),
            ClassifyOptions::default()
        );
    }

    #[test]
    fn reads_custom_choices_and_thresholds() {
        let form: FormDefinition = serde_json::from_str(
            r#"{
                "title": "Yes/No",
                "answerChoices": ["Y", "N"],
                "markThresholds": { "crossedBelow": 50, "shadedBelow": 150 },
                "radius": 12
            }"#,
        )
        .unwrap();

        let keys = form.answer_keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.key_at(1), Some(&AnswerChoiceKey::from("N")));

        let options = form.classify_options(None, BoundsPolicy::Fail).unwrap();
        assert_eq!(options.radius, 12);
        assert_eq!(options.thresholds.crossed_below, 50.0);
        assert_eq!(options.thresholds.shaded_below, 150.0);
        assert_eq!(options.bounds_policy, BoundsPolicy::Fail);
    }

    #[test]
    fn explicit_radius_overrides_form() {
        let form = FormDefinition {
            radius: Some(12),
            ..FormDefinition::default()
        };
        assert_eq!(
            form.classify_options(Some(5), BoundsPolicy::Clip)
                .unwrap()
                .radius,
            5
        );
        assert!(matches!(
            form.classify_options(Some(0), BoundsPolicy::Clip),
            Err(FormDefinitionError::ZeroRadius)
        ));
    }

    #[test]
    fn rejects_duplicate_choices() {
        let form = FormDefinition {
            answer_choices: Some(vec!["Y".into(), "Y".into()]),
            ..FormDefinition::default()
        };
        assert!(matches!(
            form.answer_keys(),
            Err(FormDefinitionError::AnswerChoices(
                ScoreError::DuplicateAnswerChoice(_)
            ))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"radius": 10}}"#).unwrap();
        let form = load_form_definition(file.path()).unwrap();
        assert_eq!(form.radius, Some(10));
    }

    #[test]
    fn reports_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ radius: ").unwrap();
        assert!(matches!(
            load_form_definition(file.path()),
            Err(FormDefinitionError::Parse { .. })
        ));
    }
}
