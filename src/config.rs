//! Configuration management with environment variable support.
//!
//! This module provides the run configuration consumed by the capture
//! pipeline, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults for local runs
//! - Builder methods for programmatic configuration
//!
//! There is no process-wide configuration: build a [`Settings`] once and
//! hand it to [`crate::runner::CaptureProcessor`]. Tests can run side by side
//! with different settings.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SNAPDIFF_TASK` | Task type (`none`, `record`, `compare`, `verify`, `compare-and-record`, `verify-and-record`) | derived from the flags below |
//! | `SNAPDIFF_RECORD` | `true` to record goldens | `false` |
//! | `SNAPDIFF_COMPARE` | `true` to compare against goldens | `false` |
//! | `SNAPDIFF_VERIFY` | `true` to compare and fail on differences | `false` |
//! | `SNAPDIFF_OUTPUT_DIR` | Directory for `_compare` / `_actual` artifacts | `build/outputs/snapdiff` |
//! | `SNAPDIFF_RESULT_DIR` | Directory for per-capture JSON results | `build/test-results/snapdiff/results` |
//! | `SNAPDIFF_RESIZE_SCALE` | Scale applied to captures before saving | `1.0` |
//! | `SNAPDIFF_CHANGE_THRESHOLD` | Changed pixel ratio tolerated as unchanged | `0.0` |
//! | `SNAPDIFF_COMPARISON_STYLE` | `simple` or `grid` | `grid` |
//! | `SNAPDIFF_PIXEL_FORMAT` | `argb8888` or `rgb565` | `argb8888` |
//! | `SNAPDIFF_IMAGE_FORMAT` | `png` or `jpeg` | `png` |

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::canvas::{ImageIoFormat, PixelFormat};
use crate::compare::ComparisonStyle;

// ============================================================================
// Default Values
// ============================================================================

/// Default directory for comparison artifacts
pub const DEFAULT_OUTPUT_DIR: &str = "build/outputs/snapdiff";

/// Default directory for per-capture JSON results
pub const DEFAULT_RESULT_DIR: &str = "build/test-results/snapdiff/results";

/// Default location of the merged run summary
pub const DEFAULT_SUMMARY_PATH: &str = "build/test-results/snapdiff/results-summary.json";

/// Default location of the HTML report
pub const DEFAULT_HTML_REPORT_PATH: &str = "build/reports/snapdiff/index.html";

/// Default resize scale (no scaling)
pub const DEFAULT_RESIZE_SCALE: f64 = 1.0;

/// Default change threshold (any changed pixel fails)
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.0;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the task type
pub const ENV_TASK: &str = "SNAPDIFF_TASK";

/// Environment variable enabling recording
pub const ENV_RECORD: &str = "SNAPDIFF_RECORD";

/// Environment variable enabling comparison
pub const ENV_COMPARE: &str = "SNAPDIFF_COMPARE";

/// Environment variable enabling verification
pub const ENV_VERIFY: &str = "SNAPDIFF_VERIFY";

/// Environment variable for the artifact output directory
pub const ENV_OUTPUT_DIR: &str = "SNAPDIFF_OUTPUT_DIR";

/// Environment variable for the result directory
pub const ENV_RESULT_DIR: &str = "SNAPDIFF_RESULT_DIR";

/// Environment variable for the resize scale
pub const ENV_RESIZE_SCALE: &str = "SNAPDIFF_RESIZE_SCALE";

/// Environment variable for the change threshold
pub const ENV_CHANGE_THRESHOLD: &str = "SNAPDIFF_CHANGE_THRESHOLD";

/// Environment variable for the comparison style
pub const ENV_COMPARISON_STYLE: &str = "SNAPDIFF_COMPARISON_STYLE";

/// Environment variable for the pixel format
pub const ENV_PIXEL_FORMAT: &str = "SNAPDIFF_PIXEL_FORMAT";

/// Environment variable for the image file format
pub const ENV_IMAGE_FORMAT: &str = "SNAPDIFF_IMAGE_FORMAT";

// ============================================================================
// Task type
// ============================================================================

/// What a test run does with each capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskType {
    /// Captures are taken but nothing is written or compared
    #[default]
    None,
    /// Write goldens
    Record,
    /// Compare against goldens and report differences
    Compare,
    /// Compare against goldens and fail on differences
    Verify,
    /// Compare, and overwrite goldens that changed
    CompareAndRecord,
    /// Verify, and overwrite goldens that changed
    VerifyAndRecord,
}

impl TaskType {
    /// Combine the three run flags the way the build integration sets them.
    pub fn of(is_recording: bool, is_comparing: bool, is_verifying: bool) -> Self {
        match (is_recording, is_comparing, is_verifying) {
            (true, _, true) => TaskType::VerifyAndRecord,
            (true, true, false) => TaskType::CompareAndRecord,
            (true, false, false) => TaskType::Record,
            (false, _, true) => TaskType::Verify,
            (false, true, false) => TaskType::Compare,
            (false, false, false) => TaskType::None,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != TaskType::None
    }

    pub fn is_recording(self) -> bool {
        matches!(
            self,
            TaskType::Record | TaskType::CompareAndRecord | TaskType::VerifyAndRecord
        )
    }

    pub fn is_comparing(self) -> bool {
        matches!(self, TaskType::Compare | TaskType::CompareAndRecord)
    }

    pub fn is_verifying(self) -> bool {
        matches!(self, TaskType::Verify | TaskType::VerifyAndRecord)
    }

    /// Verify modes compare first and only then decide to fail.
    pub fn verifying_to_comparing(self) -> Self {
        match self {
            TaskType::Verify => TaskType::Compare,
            TaskType::VerifyAndRecord => TaskType::CompareAndRecord,
            other => other,
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "none" => Ok(TaskType::None),
            "record" => Ok(TaskType::Record),
            "compare" => Ok(TaskType::Compare),
            "verify" => Ok(TaskType::Verify),
            "compare-and-record" => Ok(TaskType::CompareAndRecord),
            "verify-and-record" => Ok(TaskType::VerifyAndRecord),
            other => Err(format!("unknown task type '{}'", other)),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::None => "none",
            TaskType::Record => "record",
            TaskType::Compare => "compare",
            TaskType::Verify => "verify",
            TaskType::CompareAndRecord => "compare-and-record",
            TaskType::VerifyAndRecord => "verify-and-record",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Configuration consumed by the capture pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// What to do with each capture
    pub task: TaskType,
    /// Directory for `_compare` and `_actual` files
    pub output_dir: PathBuf,
    /// Directory for per-capture JSON results
    pub result_dir: PathBuf,
    /// Uniform scale applied to captures before save and compare
    pub resize_scale: f64,
    /// Changed pixel ratio above which a capture is `Changed`
    pub change_threshold: f64,
    /// Layout of the comparison artifact
    pub comparison_style: ComparisonStyle,
    /// Pixel format of canvases
    pub pixel_format: PixelFormat,
    /// File format used when writing images
    pub image_format: ImageIoFormat,
    /// Pixels per density-independent pixel, when known
    pub density: Option<f32>,
}

impl Settings {
    /// Create settings from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::defaults();
        let task = env::var(ENV_TASK)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| {
                TaskType::of(env_flag(ENV_RECORD), env_flag(ENV_COMPARE), env_flag(ENV_VERIFY))
            });

        Self {
            task,
            output_dir: env::var(ENV_OUTPUT_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            result_dir: env::var(ENV_RESULT_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.result_dir),
            resize_scale: env::var(ENV_RESIZE_SCALE)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.resize_scale),
            change_threshold: env::var(ENV_CHANGE_THRESHOLD)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.change_threshold),
            comparison_style: env::var(ENV_COMPARISON_STYLE)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.comparison_style),
            pixel_format: env::var(ENV_PIXEL_FORMAT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pixel_format),
            image_format: env::var(ENV_IMAGE_FORMAT)
                .ok()
                .and_then(|s| ImageIoFormat::from_extension(&s).ok())
                .unwrap_or(defaults.image_format),
            density: None,
        }
    }

    /// Create settings with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            task: TaskType::None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            result_dir: PathBuf::from(DEFAULT_RESULT_DIR),
            resize_scale: DEFAULT_RESIZE_SCALE,
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            comparison_style: ComparisonStyle::default(),
            pixel_format: PixelFormat::default(),
            image_format: ImageIoFormat::png(),
            density: None,
        }
    }

    pub fn task(mut self, task: TaskType) -> Self {
        self.task = task;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn result_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.result_dir = dir.into();
        self
    }

    pub fn resize_scale(mut self, scale: f64) -> Self {
        self.resize_scale = scale;
        self
    }

    /// Clamped to `[0, 1]`.
    pub fn change_threshold(mut self, threshold: f64) -> Self {
        self.change_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn comparison_style(mut self, style: ComparisonStyle) -> Self {
        self.comparison_style = style;
        self
    }

    pub fn pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    pub fn image_format(mut self, format: ImageIoFormat) -> Self {
        self.image_format = format;
        self
    }

    pub fn density(mut self, one_dp_px: f32) -> Self {
        self.density = Some(one_dp_px);
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Read a boolean flag; only the literal `true` enables it
fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| v == "true").unwrap_or(false)
}
