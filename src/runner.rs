//! Classification of a single capture.
//!
//! [`CaptureProcessor::process`] decides what a capture means for its golden
//! and leaves the matching files behind:
//!
//! | golden  | task            | verdict     | files written               |
//! |---------|-----------------|-------------|-----------------------------|
//! | any     | record only     | `Recorded`  | golden                      |
//! | missing | compare/verify  | `Added`     | compare, actual             |
//! | exists  | compare/verify  | `Unchanged` | none                        |
//! | exists  | compare/verify  | `Changed`   | compare, actual             |
//!
//! With recording also enabled, the actual image of `Added`/`Changed` is
//! written over the golden path. Files are written before the result reaches
//! the reporter, so a reported result always has its files on disk.

use chrono::Utc;
use image::RgbaImage;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::canvas::{Canvas, CanvasError};
use crate::compare::{
    ComparisonParameters, ImageComparator, SimpleImageComparator, ThresholdValidator,
    generate_compare_canvas,
};
use crate::config::Settings;
use crate::naming::{actual_file_path, compare_file_path, reserved_suffix};
use crate::report::{
    CaptureResult, CaptureResultReporter, ContextData, ReportError, VerifyFailure,
};

/// Result type for capture processing
pub type ProcessResult<T> = Result<T, CaptureError>;

/// Error types for capture processing
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Decoding the golden or writing an image failed
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    /// The reporter failed, including verification failures
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("golden file {} must not end with '{suffix}', which is reserved for comparison outputs", .path.display())]
    ReservedSuffix { path: PathBuf, suffix: &'static str },
}

impl CaptureError {
    /// The verification failure behind this error, if that is what it is
    pub fn verify_failure(&self) -> Option<&VerifyFailure> {
        match self {
            CaptureError::Report(ReportError::Verification(failure)) => Some(failure),
            _ => None,
        }
    }
}

/// Result timestamps for one run.
///
/// The wall clock is read once when the run starts; later stamps add the
/// monotonic time elapsed since then, so they never go backwards within a run
/// even if the system clock is stepped.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    epoch_ns: i64,
    start: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self::anchored_at(Utc::now().timestamp_nanos_opt().unwrap_or_default())
    }

    /// A clock whose first stamp is `epoch_ns`
    pub fn anchored_at(epoch_ns: i64) -> Self {
        Self {
            epoch_ns,
            start: Instant::now(),
        }
    }

    pub fn epoch_ns(&self) -> i64 {
        self.epoch_ns
    }

    /// Nanosecond timestamp for a new result
    pub fn now_ns(&self) -> i64 {
        let elapsed = i64::try_from(self.start.elapsed().as_nanos()).unwrap_or(i64::MAX);
        self.epoch_ns.saturating_add(elapsed)
    }
}

impl Default for RunClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Classifies captures against goldens
#[derive(Debug)]
pub struct CaptureProcessor {
    settings: Settings,
    comparator: Box<dyn ImageComparator>,
    validator: ThresholdValidator,
    clock: RunClock,
}

impl CaptureProcessor {
    /// Exact pixel comparison with the threshold from `settings`
    pub fn new(settings: Settings) -> Self {
        let validator = ThresholdValidator::new(settings.change_threshold);
        Self {
            settings,
            comparator: Box::new(SimpleImageComparator::default()),
            validator,
            clock: RunClock::start(),
        }
    }

    pub fn with_comparator(mut self, comparator: impl ImageComparator + 'static) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    /// Share one run clock between processors of the same run
    pub fn with_clock(mut self, clock: RunClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> RunClock {
        self.clock
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Classify `canvas` against `golden`, write the resulting files and hand
    /// the result to `reporter`.
    ///
    /// Returns `None` when the task type is `None`.
    pub fn process(
        &self,
        canvas: &mut Canvas,
        golden: &Path,
        context_data: ContextData,
        reporter: &dyn CaptureResultReporter,
    ) -> ProcessResult<Option<CaptureResult>> {
        let task = self.settings.task;
        debug!("process(): golden {} task {}", golden.display(), task);
        if !task.is_enabled() {
            debug!("process(): task is none, skipping {}", golden.display());
            return Ok(None);
        }
        if let Some(suffix) = reserved_suffix(golden) {
            return Err(CaptureError::ReservedSuffix {
                path: golden.to_path_buf(),
                suffix,
            });
        }

        let result = if task.is_comparing() || task.is_verifying() {
            self.compare(canvas, golden, context_data)?
        } else {
            canvas.save(
                golden,
                self.settings.resize_scale,
                &self.settings.image_format,
                &context_data,
            )?;
            debug!("process(): recorded golden {}", golden.display());
            CaptureResult::Recorded {
                golden_file: Some(golden.to_path_buf()),
                timestamp_ns: self.clock.now_ns(),
                context_data,
            }
        };

        info!("{}: {}", golden.display(), result.type_name());
        reporter.report(&result, task)?;
        Ok(Some(result))
    }

    fn compare(&self, canvas: &mut Canvas, golden: &Path, context_data: ContextData) -> ProcessResult<CaptureResult> {
        let scale = self.settings.resize_scale;
        let pixel_format = self.settings.pixel_format;
        let (new_width, new_height) = canvas.output_dimensions(scale);

        let golden_canvas = if golden.is_file() {
            Some(Canvas::load(golden, pixel_format)?)
        } else {
            debug!("compare(): no golden at {}", golden.display());
            None
        };

        let mut diff_percentage = None;
        let changed = match &golden_canvas {
            None => true,
            Some(reference) if (reference.width(), reference.height()) != (new_width, new_height) => {
                info!(
                    "{}: image size changed, golden {}x{}, new {}x{}",
                    golden.display(),
                    reference.width(),
                    reference.height(),
                    new_width,
                    new_height
                );
                true
            }
            Some(reference) => {
                let comparison = canvas.differ(reference, scale, self.comparator.as_ref());
                let changed = !self.validator.is_unchanged(&comparison);
                debug!(
                    "compare(): {} changed pixels of {} (ratio {}), threshold {}",
                    comparison.changed_pixels,
                    comparison.pixel_count,
                    comparison.changed_pixel_ratio(),
                    self.validator.threshold()
                );
                diff_percentage = Some((comparison.changed_pixel_ratio() * 100.0) as f32);
                changed
            }
        };

        if !changed {
            return Ok(CaptureResult::Unchanged {
                golden_file: Some(golden.to_path_buf()),
                timestamp_ns: self.clock.now_ns(),
                context_data,
            });
        }

        let output_dir = &self.settings.output_dir;
        let compare_file = compare_file_path(golden, output_dir);
        let actual_file = if self.settings.task.is_recording() {
            golden.to_path_buf()
        } else {
            actual_file_path(golden, output_dir)
        };

        let new_image = canvas.output_image(scale);
        let blank;
        let reference = match &golden_canvas {
            Some(reference) => reference.buffer(),
            None => {
                blank = RgbaImage::new(new_width, new_height);
                &blank
            }
        };
        let params = ComparisonParameters::new(
            reference,
            &new_image,
            &self.settings.comparison_style,
            self.settings.density,
        );
        let mut comparison_canvas = generate_compare_canvas(&params, pixel_format);
        comparison_canvas.save(&compare_file, 1.0, &self.settings.image_format, &context_data)?;
        debug!("compare(): saved {}", compare_file.display());

        canvas.save(&actual_file, scale, &self.settings.image_format, &context_data)?;
        debug!("compare(): saved {}", actual_file.display());

        let timestamp_ns = self.clock.now_ns();
        Ok(match golden_canvas {
            Some(_) => CaptureResult::Changed {
                compare_file: Some(compare_file),
                golden_file: Some(golden.to_path_buf()),
                actual_file: Some(actual_file),
                timestamp_ns,
                diff_percentage,
                context_data,
            },
            None => CaptureResult::Added {
                compare_file: Some(compare_file),
                actual_file: Some(actual_file),
                golden_file: Some(golden.to_path_buf()),
                timestamp_ns,
                context_data,
            },
        })
    }
}
