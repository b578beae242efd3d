use image::{DynamicImage, GrayImage, Luma, Rgb};
use imageproc::{
    contrast::{otsu_level, threshold},
    distance_transform::Norm,
    morphology::open,
    rect::Rect,
};
use log::debug;
use logging_timer::time;

pub const WHITE: Luma<u8> = Luma([u8::MAX]);
pub const BLACK: Luma<u8> = Luma([u8::MIN]);

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// L∞ radius of the opening element, i.e. a 5×5 square of ones.
pub const OPENING_RADIUS: u8 = 2;

/// Converts a scanned form to a two-level image ready for mark scoring.
#[time]
pub fn binarize(img: &DynamicImage) -> GrayImage {
    binarize_luma(&to_luma_bt601(img))
}

/// Grayscale conversion with BT.601 weights (`0.299 R + 0.587 G + 0.114 B`)
/// in 14-bit fixed point, rounded. The mark thresholds were calibrated
/// against this conversion rather than `image`'s BT.709 `to_luma8`.
pub fn to_luma_bt601(img: &DynamicImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;

    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
        let luma = (u32::from(r) * R + u32::from(g) * G + u32::from(b) * B + (1 << (SHIFT - 1)))
            >> SHIFT;
        Luma([luma as u8])
    })
}

/// Thresholds a grayscale image at its Otsu level and then opens it to drop
/// foreground specks smaller than the 5×5 structuring element. Every pixel of
/// the result is either [`WHITE`] or [`BLACK`].
pub fn binarize_luma(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    let opened = open(&threshold(gray, level), Norm::LInf, OPENING_RADIUS);
    debug!(
        "binarized {}x{} image at level {} ({:.1}% white)",
        opened.width(),
        opened.height(),
        level,
        ratio(&opened, &WHITE) * 100.0
    );
    opened
}

/// Mean luma of the pixels inside `region`.
///
/// `region` must lie within the image bounds.
pub fn mean_luma(img: &GrayImage, region: &Rect) -> f64 {
    let mut sum = 0u64;
    for y in region.top()..=region.bottom() {
        for x in region.left()..=region.right() {
            sum += u64::from(img.get_pixel(x as u32, y as u32).0[0]);
        }
    }
    sum as f64 / (u64::from(region.width()) * u64::from(region.height())) as f64
}

/// Determines the number of pixels in an image that match the given luma.
pub fn count_pixels(img: &GrayImage, luma: &Luma<u8>) -> u32 {
    img.pixels().filter(|p| *p == luma).count() as u32
}

/// Determines the ratio of pixels in an image that match the given luma.
pub fn ratio(img: &GrayImage, luma: &Luma<u8>) -> f32 {
    let total = img.width() * img.height();
    if total == 0 {
        return 0.0;
    }
    count_pixels(img, luma) as f32 / total as f32
}
