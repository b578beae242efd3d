use std::path::{Path, PathBuf};

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use log::{debug, warn};

use crate::{
    classify::Classification,
    geometry::{region_around, Region},
    image_utils::{BLUE, GREEN, RED},
    marks::ScoredMark,
};

/// Creates a path for a debug image of `source` inside `output_dir`.
pub fn debug_image_path(output_dir: &Path, source: &Path, label: &str) -> PathBuf {
    output_dir.join(format!(
        "{}_debug_{}.png",
        source
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy(),
        label
    ))
}

/// Writes intermediate images for a single form when debugging is enabled.
#[derive(Debug, Clone)]
pub struct ImageDebugWriter {
    target: Option<(PathBuf, PathBuf)>,
}

impl ImageDebugWriter {
    pub fn new(output_dir: PathBuf, source: PathBuf) -> Self {
        Self {
            target: Some((output_dir, source)),
        }
    }

    pub fn disabled() -> Self {
        Self { target: None }
    }

    /// Saves `img` under `label`, returning where it went. Failures are
    /// logged rather than returned since debug output never affects scoring.
    pub fn write_gray(&self, label: &str, img: &GrayImage) -> Option<PathBuf> {
        let (output_dir, source) = self.target.as_ref()?;
        let path = debug_image_path(output_dir, source, label);
        match img.save(&path) {
            Ok(()) => {
                debug!("wrote debug image {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("unable to write debug image {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Outline color for a bubble with the given classification.
pub fn classification_color(classification: Classification) -> Rgb<u8> {
    match classification {
        Classification::Crossed => BLUE,
        Classification::Shaded => RED,
        Classification::Blank => GREEN,
    }
}

/// Outlines every scored bubble with a 2px rect in its classification's color.
/// The outer ring's corners are `(x - r, y - r)` and `(x + r, y + r)`.
pub fn draw_scored_marks_mut(canvas: &mut RgbImage, scored_marks: &[ScoredMark], radius: u32) {
    for scored_mark in scored_marks {
        let Some(outline) = region_around(&scored_mark.center, radius) else {
            continue;
        };
        let color = classification_color(scored_mark.classification);

        draw_clipped_outline_mut(canvas, &outline, color);
        if outline.right - outline.left >= 2 && outline.bottom - outline.top >= 2 {
            let inner = Region {
                left: outline.left + 1,
                top: outline.top + 1,
                right: outline.right - 1,
                bottom: outline.bottom - 1,
            };
            draw_clipped_outline_mut(canvas, &inner, color);
        }
    }
}

/// Draws the four edges of `outline`, corners inclusive, skipping whatever
/// falls outside the canvas.
fn draw_clipped_outline_mut(canvas: &mut RgbImage, outline: &Region, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let (max_x, max_y) = (i64::from(width) - 1, i64::from(height) - 1);

    let (x0, x1) = (outline.left.max(0), outline.right.min(max_x));
    if x0 <= x1 {
        for y in [outline.top, outline.bottom] {
            if (0..=max_y).contains(&y) {
                draw_line_segment_mut(canvas, (x0 as f32, y as f32), (x1 as f32, y as f32), color);
            }
        }
    }

    let (y0, y1) = (outline.top.max(0), outline.bottom.min(max_y));
    if y0 <= y1 {
        for x in [outline.left, outline.right] {
            if (0..=max_x).contains(&x) {
                draw_line_segment_mut(canvas, (x as f32, y0 as f32), (x as f32, y1 as f32), color);
            }
        }
    }
}
