use imageproc::rect::Rect;

use crate::types::PixelPoint;

/// The square `[left, right) × [top, bottom)` scored for a bubble.
///
/// Edges are kept as `i64` so that `x ± r` and `y ± r` are exact for every
/// `i32` center and `u32` radius. A [`Rect`] is only built once the region has
/// been clipped to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

/// The region `[x - r, x + r) × [y - r, y + r)` around `center`. A zero radius
/// has no region.
pub fn region_around(center: &PixelPoint, radius: u32) -> Option<Region> {
    if radius == 0 {
        return None;
    }
    let (x, y, r) = (i64::from(center.x), i64::from(center.y), i64::from(radius));
    Some(Region {
        left: x - r,
        top: y - r,
        right: x + r,
        bottom: y + r,
    })
}

impl Region {
    /// Whether every pixel of the region lies in a `width`×`height` image.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.right <= i64::from(width)
            && self.bottom <= i64::from(height)
    }

    /// The pixels of the region inside a `width`×`height` image, if any.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        let left = self.left.max(0);
        let top = self.top.max(0);
        let right = self.right.min(i64::from(width));
        let bottom = self.bottom.min(i64::from(height));
        if left >= right || top >= bottom {
            return None;
        }

        Some(
            Rect::at(i32::try_from(left).ok()?, i32::try_from(top).ok()?)
                .of_size(u32::try_from(right - left).ok()?, u32::try_from(bottom - top).ok()?),
        )
    }
}
