//! Sinks for classified captures.

use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::store::{merge_into_file, write_result_file};
use super::types::{CaptureResult, CaptureResults, ReportError, ReportResult, VerifyFailure};
use crate::config::TaskType;

/// Receives every capture result once it has been classified and its files
/// are on disk
pub trait CaptureResultReporter: Send + Sync {
    fn report(&self, result: &CaptureResult, task: TaskType) -> ReportResult<()>;
}

/// File name of a per-capture result: `<timestamp>_<golden stem>.json`.
///
/// Falls back to the actual image's stem when the golden path is absent.
pub fn result_file_name(result: &CaptureResult) -> String {
    let stem = result
        .golden_file()
        .or(result.actual_file())
        .and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}_{}.json", result.timestamp_ns(), stem)
}

/// Writes each result as its own JSON file under a results directory
#[derive(Debug, Clone)]
pub struct JsonOutputReporter {
    result_dir: PathBuf,
}

impl JsonOutputReporter {
    pub fn new(result_dir: impl Into<PathBuf>) -> Self {
        Self {
            result_dir: result_dir.into(),
        }
    }

    pub fn result_dir(&self) -> &Path {
        &self.result_dir
    }
}

impl CaptureResultReporter for JsonOutputReporter {
    fn report(&self, result: &CaptureResult, _task: TaskType) -> ReportResult<()> {
        let path = self.result_dir.join(result_file_name(result));
        write_result_file(&path, result)?;
        debug!("JsonOutputReporter: wrote {}", path.display());
        Ok(())
    }
}

/// Writes the JSON result, then fails on added or changed captures
#[derive(Debug, Clone)]
pub struct VerifyReporter {
    json: JsonOutputReporter,
}

impl VerifyReporter {
    pub fn new(result_dir: impl Into<PathBuf>) -> Self {
        Self {
            json: JsonOutputReporter::new(result_dir),
        }
    }
}

impl CaptureResultReporter for VerifyReporter {
    fn report(&self, result: &CaptureResult, task: TaskType) -> ReportResult<()> {
        self.json.report(result, task)?;
        if result.is_failure() {
            return Err(ReportError::Verification(VerifyFailure {
                result: result.clone(),
            }));
        }
        Ok(())
    }
}

/// Picks the verify or the plain JSON behavior from the task type
#[derive(Debug, Clone)]
pub struct DefaultReporter {
    json: JsonOutputReporter,
    verify: VerifyReporter,
}

impl DefaultReporter {
    pub fn new(result_dir: impl Into<PathBuf>) -> Self {
        let result_dir = result_dir.into();
        Self {
            json: JsonOutputReporter::new(result_dir.clone()),
            verify: VerifyReporter::new(result_dir),
        }
    }
}

impl CaptureResultReporter for DefaultReporter {
    fn report(&self, result: &CaptureResult, task: TaskType) -> ReportResult<()> {
        if task.is_verifying() {
            self.verify.report(result, task)
        } else {
            self.json.report(result, task)
        }
    }
}

/// Collects results for a whole run.
///
/// Appending is the only mutation. The summary is derived from the list each
/// time a report is built.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    results: Mutex<Vec<CaptureResult>>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, result: CaptureResult) {
        self.lock().push(result);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of everything appended so far
    pub fn results(&self) -> CaptureResults {
        CaptureResults::from_results(self.lock().clone())
    }

    /// Merge this run's results into a shared summary file
    pub fn flush(&self, path: &Path) -> ReportResult<CaptureResults> {
        let report = self.results();
        info!(
            "Flushing {} results to {} (recorded {}, added {}, changed {}, unchanged {})",
            report.summary.total,
            path.display(),
            report.summary.recorded,
            report.summary.added,
            report.summary.changed,
            report.summary.unchanged
        );
        merge_into_file(path, report)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CaptureResult>> {
        self.results.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CaptureResultReporter for ReportAggregator {
    fn report(&self, result: &CaptureResult, _task: TaskType) -> ReportResult<()> {
        self.append(result.clone());
        Ok(())
    }
}
