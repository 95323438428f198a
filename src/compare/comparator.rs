//! Pixel comparators.
//!
//! The comparison domain is the union of both images' extents. Coordinates
//! covered by only one image always count as changed, so a size change can
//! never compare as identical.

use image::{Rgba, RgbaImage};
use std::fmt;

use super::types::ComparisonResult;

/// Compares a new image against a reference
pub trait ImageComparator: fmt::Debug + Send + Sync {
    fn compare(&self, new_image: &RgbaImage, reference: &RgbaImage) -> ComparisonResult;
}

/// Every fully transparent pixel compares as the same value, whatever color
/// payload the codec left behind.
pub fn normalize_transparent(px: Rgba<u8>) -> Rgba<u8> {
    if px[3] == 0 { Rgba([0, 0, 0, 0]) } else { px }
}

/// Per-pixel comparison with an optional per-channel tolerance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimpleImageComparator {
    /// Largest per-channel difference still treated as equal; 0 is exact
    pub max_channel_distance: u8,
}

impl SimpleImageComparator {
    pub fn exact() -> Self {
        Self::default()
    }

    pub fn with_tolerance(max_channel_distance: u8) -> Self {
        Self {
            max_channel_distance,
        }
    }

    /// Whether two pixels match under this comparator's tolerance
    pub fn pixels_match(&self, a: Rgba<u8>, b: Rgba<u8>) -> bool {
        let a = normalize_transparent(a);
        let b = normalize_transparent(b);
        a.0.iter()
            .zip(b.0.iter())
            .all(|(&ca, &cb)| ca.abs_diff(cb) <= self.max_channel_distance)
    }
}

impl ImageComparator for SimpleImageComparator {
    fn compare(&self, new_image: &RgbaImage, reference: &RgbaImage) -> ComparisonResult {
        let width = new_image.width().max(reference.width());
        let height = new_image.height().max(reference.height());
        let mut mask = Vec::with_capacity(width as usize * height as usize);
        let mut changed_pixels = 0u64;

        for y in 0..height {
            for x in 0..width {
                let changed = match (
                    new_image.get_pixel_checked(x, y),
                    reference.get_pixel_checked(x, y),
                ) {
                    (Some(&a), Some(&b)) => !self.pixels_match(a, b),
                    _ => true,
                };
                if changed {
                    changed_pixels += 1;
                }
                mask.push(changed);
            }
        }

        ComparisonResult {
            width,
            height,
            pixel_count: u64::from(width) * u64::from(height),
            changed_pixels,
            mask: Some(mask),
        }
    }
}
