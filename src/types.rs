use std::fmt::Display;

use imageproc::point::Point;
use serde::{Deserialize, Serialize};

/// Pixel coordinates of a bubble's center on the scanned form.
pub type PixelPoint = Point<i32>;

/// The bubbles of one form field, in answer-choice order.
pub type Row = Vec<PixelPoint>;

/// Every field of the form. Rows are independent of each other, but the
/// order of points within a row selects the answer choice.
pub type CoordinateMap = Vec<Row>;

// Defines a new type that wraps a String for use as an ID.
macro_rules! idtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

idtype!(AnswerChoiceKey);
