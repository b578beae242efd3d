use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{geometry::region_around, image_utils::mean_luma, types::PixelPoint};

pub const DEFAULT_RADIUS: u32 = 8;

/// What a respondent did to a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Blank,
    Shaded,
    Crossed,
}

/// Mean-luma cutoffs separating crossed, shaded and blank bubbles.
///
/// Both comparisons are strict. A mean exactly equal to `crossed_below` is
/// neither crossed nor shaded, and a mean exactly equal to `shaded_below` is
/// not shaded, so both land on [`Classification::Blank`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkThresholds {
    pub crossed_below: f64,
    pub shaded_below: f64,
}

impl Default for MarkThresholds {
    fn default() -> Self {
        Self {
            crossed_below: 69.0,
            shaded_below: 135.0,
        }
    }
}

impl MarkThresholds {
    pub fn classify_mean(&self, mean: f64) -> Classification {
        if mean < self.crossed_below {
            Classification::Crossed
        } else if mean > self.crossed_below && mean < self.shaded_below {
            Classification::Shaded
        } else {
            Classification::Blank
        }
    }
}

/// How to score a bubble whose region reaches past the image edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsPolicy {
    /// Score only the part inside the image. Nothing inside means blank.
    #[default]
    Clip,
    /// Refuse to score the bubble.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyOptions {
    pub radius: u32,
    pub thresholds: MarkThresholds,
    pub bounds_policy: BoundsPolicy,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            thresholds: MarkThresholds::default(),
            bounds_policy: BoundsPolicy::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    #[error("region around ({x}, {y}) extends outside the {width}x{height} image")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("bubble radius must be at least 1")]
    ZeroRadius,
}

/// Classifies the bubble centered at `point` from the mean luma of the square
/// region around it in a binarized image.
pub fn classify(
    raster: &GrayImage,
    point: &PixelPoint,
    options: &ClassifyOptions,
) -> Result<Classification, ClassifyError> {
    let region = region_around(point, options.radius).ok_or(ClassifyError::ZeroRadius)?;
    let (width, height) = raster.dimensions();
    let clipped = region.clip_to(width, height);

    let region = match (options.bounds_policy, clipped) {
        (BoundsPolicy::Clip, Some(clipped)) => clipped,
        (BoundsPolicy::Clip, None) => return Ok(Classification::Blank),
        (BoundsPolicy::Fail, Some(clipped)) if region.is_within(width, height) => clipped,
        (BoundsPolicy::Fail, _) => {
            return Err(ClassifyError::OutOfBounds {
                x: point.x,
                y: point.y,
                width,
                height,
            })
        }
    };

    Ok(options.thresholds.classify_mean(mean_luma(raster, &region)))
}

#[cfg(test)]
mod tests {
    use image::Luma;
    use proptest::prelude::*;

    use super::*;
    use crate::{
        coordinates::parse_coordinate_map,
        image_utils::{BLACK, WHITE},
    };

    /// A 170×170 image whose first `white_rows` rows are white.
    fn striped(white_rows: u32) -> GrayImage {
        GrayImage::from_fn(170, 170, |_, y| if y < white_rows { WHITE } else { BLACK })
    }

    fn whole_image_options() -> ClassifyOptions {
        ClassifyOptions {
            radius: 85,
            ..ClassifyOptions::default()
        }
    }

    #[test]
    fn scores_light_region_blank_and_dark_region_crossed() {
        let raster = GrayImage::from_fn(64, 64, |x, y| {
            if (2..18).contains(&x) && (2..18).contains(&y) {
                WHITE
            } else {
                BLACK
            }
        });
        let options = ClassifyOptions::default();

        assert_eq!(
            classify(&raster, &PixelPoint::new(10, 10), &options),
            Ok(Classification::Blank)
        );
        assert_eq!(
            classify(&raster, &PixelPoint::new(30, 10), &options),
            Ok(Classification::Crossed)
        );
    }

    #[test]
    fn scores_half_filled_region_shaded() {
        // 16 of 32 columns white: mean 127.5
        let raster = GrayImage::from_fn(32, 32, |x, _| if x < 16 { WHITE } else { BLACK });
        let options = ClassifyOptions {
            radius: 16,
            ..ClassifyOptions::default()
        };
        assert_eq!(
            classify(&raster, &PixelPoint::new(16, 16), &options),
            Ok(Classification::Shaded)
        );
    }

    #[test]
    fn mean_exactly_at_crossed_cutoff_is_blank() {
        // 46 white rows: 46 * 170 * 255 / (170 * 170) == 69
        let raster = striped(46);
        assert_eq!(
            classify(&raster, &PixelPoint::new(85, 85), &whole_image_options()),
            Ok(Classification::Blank)
        );
    }

    #[test]
    fn mean_exactly_at_shaded_cutoff_is_blank() {
        // 90 white rows: 90 * 170 * 255 / (170 * 170) == 135
        let raster = striped(90);
        assert_eq!(
            classify(&raster, &PixelPoint::new(85, 85), &whole_image_options()),
            Ok(Classification::Blank)
        );
    }

    #[test]
    fn mean_just_inside_cutoffs_is_shaded() {
        assert_eq!(
            classify(&striped(47), &PixelPoint::new(85, 85), &whole_image_options()),
            Ok(Classification::Shaded)
        );
        assert_eq!(
            classify(&striped(89), &PixelPoint::new(85, 85), &whole_image_options()),
            Ok(Classification::Shaded)
        );
        assert_eq!(
            classify(&striped(45), &PixelPoint::new(85, 85), &whole_image_options()),
            Ok(Classification::Crossed)
        );
    }

    #[test]
    fn clip_policy_scores_only_the_visible_part() {
        // the visible 8×8 corner is white, everything else is black
        let raster = GrayImage::from_fn(40, 40, |x, y| if x < 8 && y < 8 { WHITE } else { BLACK });
        assert_eq!(
            classify(&raster, &PixelPoint::new(0, 0), &ClassifyOptions::default()),
            Ok(Classification::Blank)
        );
    }

    #[test]
    fn clip_policy_scores_region_outside_image_blank() {
        let raster = GrayImage::from_pixel(40, 40, BLACK);
        assert_eq!(
            classify(&raster, &PixelPoint::new(-50, 10), &ClassifyOptions::default()),
            Ok(Classification::Blank)
        );
        assert_eq!(
            classify(&GrayImage::new(0, 0), &PixelPoint::new(0, 0), &ClassifyOptions::default()),
            Ok(Classification::Blank)
        );
    }

    #[test]
    fn fail_policy_rejects_regions_past_the_edge() {
        let raster = GrayImage::from_pixel(40, 40, WHITE);
        let options = ClassifyOptions {
            bounds_policy: BoundsPolicy::Fail,
            ..ClassifyOptions::default()
        };

        assert_eq!(
            classify(&raster, &PixelPoint::new(8, 8), &options),
            Ok(Classification::Blank)
        );
        assert_eq!(
            classify(&raster, &PixelPoint::new(7, 20), &options),
            Err(ClassifyError::OutOfBounds {
                x: 7,
                y: 20,
                width: 40,
                height: 40,
            })
        );
        assert!(classify(&raster, &PixelPoint::new(90, 90), &options).is_err());
    }

    #[test]
    fn centers_at_the_integer_limit_are_scored_without_overflow() {
        let point = parse_coordinate_map("2147483647 10", ' ').unwrap()[0][0];
        let raster = GrayImage::new(40, 40);

        assert_eq!(
            classify(&raster, &point, &ClassifyOptions::default()),
            Ok(Classification::Blank)
        );
        assert_eq!(
            classify(
                &raster,
                &point,
                &ClassifyOptions {
                    bounds_policy: BoundsPolicy::Fail,
                    ..ClassifyOptions::default()
                }
            ),
            Err(ClassifyError::OutOfBounds {
                x: i32::MAX,
                y: 10,
                width: 40,
                height: 40,
            })
        );
        assert_eq!(
            classify(&raster, &PixelPoint::new(i32::MIN, i32::MIN), &ClassifyOptions::default()),
            Ok(Classification::Blank)
        );
    }

    #[test]
    fn zero_radius_is_rejected() {
        let options = ClassifyOptions {
            radius: 0,
            ..ClassifyOptions::default()
        };
        assert_eq!(
            classify(&GrayImage::new(4, 4), &PixelPoint::new(1, 1), &options),
            Err(ClassifyError::ZeroRadius)
        );
    }

    #[test]
    fn custom_thresholds_move_the_cutoffs() {
        let thresholds = MarkThresholds {
            crossed_below: 10.0,
            shaded_below: 200.0,
        };
        assert_eq!(thresholds.classify_mean(5.0), Classification::Crossed);
        assert_eq!(thresholds.classify_mean(150.0), Classification::Shaded);
        assert_eq!(thresholds.classify_mean(200.0), Classification::Blank);
    }

    #[test]
    fn thresholds_deserialize_with_defaults() {
        let thresholds: MarkThresholds = serde_json::from_str(r#"{"shadedBelow": 140}"#).unwrap();
        assert_eq!(
            thresholds,
            MarkThresholds {
                crossed_below: 69.0,
                shaded_below: 140.0,
            }
        );
    }

    proptest! {
        #[test]
        fn classification_follows_strict_cutoffs(mean in 0.0f64..=255.0) {
            let expected = if mean < 69.0 {
                Classification::Crossed
            } else if mean > 69.0 && mean < 135.0 {
                Classification::Shaded
            } else {
                Classification::Blank
            };
            prop_assert_eq!(MarkThresholds::default().classify_mean(mean), expected);
        }

        #[test]
        fn classification_is_repeatable(
            pixels in prop::collection::vec(prop::bool::ANY, 24 * 24),
            x in -10i32..34,
            y in -10i32..34,
        ) {
            let raster = GrayImage::from_fn(24, 24, |px, py| {
                if pixels[(py * 24 + px) as usize] { Luma([255]) } else { Luma([0]) }
            });
            let point = PixelPoint::new(x, y);
            let options = ClassifyOptions::default();
            prop_assert_eq!(
                classify(&raster, &point, &options),
                classify(&raster.clone(), &point, &options)
            );
        }
    }
}
