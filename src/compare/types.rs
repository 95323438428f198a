// Core types for image comparison

use std::fmt;
use std::str::FromStr;

/// Default spacing of the coarse grid, in density-independent pixels
pub const DEFAULT_BIG_LINE_SPACE_DP: u32 = 16;

/// Default spacing of the fine grid, in density-independent pixels
pub const DEFAULT_SMALL_LINE_SPACE_DP: u32 = 4;

/// Outcome of comparing a new image against a reference
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// Width of the comparison domain (max of both widths)
    pub width: u32,
    /// Height of the comparison domain (max of both heights)
    pub height: u32,
    /// Pixels compared, `width * height`
    pub pixel_count: u64,
    /// Pixels that differ or fall outside one of the images
    pub changed_pixels: u64,
    /// Row-major changed flags over the domain, when the comparator keeps them
    pub mask: Option<Vec<bool>>,
}

impl ComparisonResult {
    /// Fraction of compared pixels that differ, in `[0, 1]`
    pub fn changed_pixel_ratio(&self) -> f64 {
        if self.pixel_count == 0 {
            return 0.0;
        }
        self.changed_pixels as f64 / self.pixel_count as f64
    }

    pub fn is_identical(&self) -> bool {
        self.changed_pixels == 0
    }

    /// Whether the pixel at `(x, y)` was marked changed
    pub fn is_changed_at(&self, x: u32, y: u32) -> Option<bool> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let mask = self.mask.as_ref()?;
        mask.get((y as usize) * (self.width as usize) + x as usize).copied()
    }
}

/// Decides whether a comparison is close enough to count as unchanged
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdValidator {
    threshold: f64,
}

impl ThresholdValidator {
    /// Clamped to `[0, 1]`
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// A ratio equal to the threshold still passes
    pub fn is_unchanged(&self, result: &ComparisonResult) -> bool {
        result.changed_pixel_ratio() <= self.threshold
    }
}

impl Default for ThresholdValidator {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Layout of the composed comparison artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonStyle {
    /// `[reference | diff | new]` side by side
    Simple,
    /// Panels with margins, density-aware gridlines and optional labels
    Grid {
        big_line_space_dp: Option<u32>,
        small_line_space_dp: Option<u32>,
        has_label: bool,
    },
}

impl ComparisonStyle {
    pub fn grid() -> Self {
        ComparisonStyle::Grid {
            big_line_space_dp: Some(DEFAULT_BIG_LINE_SPACE_DP),
            small_line_space_dp: Some(DEFAULT_SMALL_LINE_SPACE_DP),
            has_label: true,
        }
    }
}

impl Default for ComparisonStyle {
    fn default() -> Self {
        Self::grid()
    }
}

impl FromStr for ComparisonStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(ComparisonStyle::Simple),
            "grid" => Ok(ComparisonStyle::grid()),
            other => Err(format!("unknown comparison style '{}'", other)),
        }
    }
}

impl fmt::Display for ComparisonStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonStyle::Simple => f.write_str("simple"),
            ComparisonStyle::Grid { .. } => f.write_str("grid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(changed: u64, count: u64) -> ComparisonResult {
        ComparisonResult {
            width: count as u32,
            height: 1,
            pixel_count: count,
            changed_pixels: changed,
            mask: None,
        }
    }

    #[test]
    fn test_ratio_of_empty_domain_is_zero() {
        assert_eq!(result(0, 0).changed_pixel_ratio(), 0.0);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let one_of_101 = result(1, 101);
        assert!(ThresholdValidator::new(1.0 / 101.0).is_unchanged(&one_of_101));
        assert!(!ThresholdValidator::new(1.0 / 101.0 - 1e-9).is_unchanged(&one_of_101));
        assert!(!ThresholdValidator::default().is_unchanged(&one_of_101));
        assert!(ThresholdValidator::default().is_unchanged(&result(0, 101)));
    }

    #[test]
    fn test_mask_lookup() {
        let r = ComparisonResult {
            width: 2,
            height: 2,
            pixel_count: 4,
            changed_pixels: 1,
            mask: Some(vec![false, false, true, false]),
        };
        assert_eq!(r.is_changed_at(0, 1), Some(true));
        assert_eq!(r.is_changed_at(1, 1), Some(false));
        assert_eq!(r.is_changed_at(2, 0), None);
    }

    #[test]
    fn test_style_parse() {
        assert_eq!("Simple".parse(), Ok(ComparisonStyle::Simple));
        assert_eq!("grid".parse(), Ok(ComparisonStyle::grid()));
        assert!("mosaic".parse::<ComparisonStyle>().is_err());
        assert_eq!(ComparisonStyle::default().to_string(), "grid");
    }
}
