//! snapdiff - screenshot regression testing core.
//!
//! This crate provides:
//! - An RGBA canvas with shapes, bitmap-font text and deferred draws
//! - Pixel comparison of a capture against its golden image
//! - Comparison artifacts (reference, diff and new side by side)
//! - Classification of each capture as recorded, added, changed or unchanged
//! - JSON results and an HTML report for a whole run
//!
//! # Example
//!
//! ```rust,no_run
//! use snapdiff::canvas::Canvas;
//! use snapdiff::config::{Settings, TaskType};
//! use snapdiff::report::{ContextData, DefaultReporter};
//! use snapdiff::runner::CaptureProcessor;
//! use std::path::Path;
//!
//! let settings = Settings::from_env().task(TaskType::Compare);
//! let reporter = DefaultReporter::new(settings.result_dir.clone());
//! let mut canvas = Canvas::load(Path::new("capture.png"), settings.pixel_format).unwrap();
//! let processor = CaptureProcessor::new(settings);
//! let result = processor
//!     .process(&mut canvas, Path::new("goldens/home.png"), ContextData::new(), &reporter)
//!     .unwrap();
//! println!("{:?}", result.map(|r| r.type_name()));
//! ```

pub mod canvas;
pub mod compare;
pub mod config;
pub mod naming;
pub mod report;
pub mod runner;

mod utils;

// Re-export canvas types
pub use canvas::{Canvas, CanvasError, CanvasResult, Color, ImageIoFormat, PixelFormat, Rect};

// Re-export comparison types
pub use compare::{
    ComparisonResult, ComparisonStyle, ImageComparator, SimpleImageComparator, ThresholdValidator,
    generate_compare_canvas, generate_diff_image,
};

// Re-export configuration
pub use config::{Settings, TaskType};

// Re-export naming
pub use naming::{NameGenerator, NamingStrategy};

// Re-export report types
pub use report::{
    CaptureResult, CaptureResultReporter, CaptureResults, ContextData, DefaultReporter,
    ReportAggregator, ReportError, ReportResult, ResultSummary, VerifyFailure,
};

// Re-export the pipeline
pub use runner::{CaptureError, CaptureProcessor, ProcessResult, RunClock};
