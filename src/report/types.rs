// Core types for capture results and run reports

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Free-form metadata attached to a capture
pub type ContextData = Map<String, Value>;

/// The classification of one capture.
///
/// `Recorded` and `Unchanged` only point at the golden. `Added` and `Changed`
/// also carry the saved actual image and the comparison artifact. Any path
/// may be absent in a file written by another tool; readers treat a missing
/// key as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CaptureResult {
    Recorded {
        #[serde(
            rename = "golden_file_path",
            default,
            skip_serializing_if = "Option::is_none",
            with = "absolute_path"
        )]
        golden_file: Option<PathBuf>,
        #[serde(rename = "timestamp")]
        timestamp_ns: i64,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        context_data: ContextData,
    },
    Added {
        #[serde(
            rename = "compare_file_path",
            default,
            skip_serializing_if = "Option::is_none",
            with = "absolute_path"
        )]
        compare_file: Option<PathBuf>,
        #[serde(
            rename = "actual_file_path",
            default,
            skip_serializing_if = "Option::is_none",
            with = "absolute_path"
        )]
        actual_file: Option<PathBuf>,
        #[serde(
            rename = "golden_file_path",
            default,
            skip_serializing_if = "Option::is_none",
            with = "absolute_path"
        )]
        golden_file: Option<PathBuf>,
        #[serde(rename = "timestamp")]
        timestamp_ns: i64,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        context_data: ContextData,
    },
    Changed {
        #[serde(
            rename = "compare_file_path",
            default,
            skip_serializing_if = "Option::is_none",
            with = "absolute_path"
        )]
        compare_file: Option<PathBuf>,
        #[serde(
            rename = "golden_file_path",
            default,
            skip_serializing_if = "Option::is_none",
            with = "absolute_path"
        )]
        golden_file: Option<PathBuf>,
        #[serde(
            rename = "actual_file_path",
            default,
            skip_serializing_if = "Option::is_none",
            with = "absolute_path"
        )]
        actual_file: Option<PathBuf>,
        #[serde(rename = "timestamp")]
        timestamp_ns: i64,
        /// Changed pixel ratio as a percentage, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diff_percentage: Option<f32>,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        context_data: ContextData,
    },
    Unchanged {
        #[serde(
            rename = "golden_file_path",
            default,
            skip_serializing_if = "Option::is_none",
            with = "absolute_path"
        )]
        golden_file: Option<PathBuf>,
        #[serde(rename = "timestamp")]
        timestamp_ns: i64,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        context_data: ContextData,
    },
}

/// Tags accepted in the `type` field
pub const KNOWN_TYPES: [&str; 4] = ["recorded", "added", "changed", "unchanged"];

impl CaptureResult {
    pub fn type_name(&self) -> &'static str {
        match self {
            CaptureResult::Recorded { .. } => "recorded",
            CaptureResult::Added { .. } => "added",
            CaptureResult::Changed { .. } => "changed",
            CaptureResult::Unchanged { .. } => "unchanged",
        }
    }

    pub fn golden_file(&self) -> Option<&Path> {
        match self {
            CaptureResult::Recorded { golden_file, .. }
            | CaptureResult::Added { golden_file, .. }
            | CaptureResult::Changed { golden_file, .. }
            | CaptureResult::Unchanged { golden_file, .. } => golden_file.as_deref(),
        }
    }

    pub fn actual_file(&self) -> Option<&Path> {
        match self {
            CaptureResult::Added { actual_file, .. } | CaptureResult::Changed { actual_file, .. } => {
                actual_file.as_deref()
            }
            _ => None,
        }
    }

    pub fn compare_file(&self) -> Option<&Path> {
        match self {
            CaptureResult::Added { compare_file, .. }
            | CaptureResult::Changed { compare_file, .. } => compare_file.as_deref(),
            _ => None,
        }
    }

    pub fn timestamp_ns(&self) -> i64 {
        match self {
            CaptureResult::Recorded { timestamp_ns, .. }
            | CaptureResult::Added { timestamp_ns, .. }
            | CaptureResult::Changed { timestamp_ns, .. }
            | CaptureResult::Unchanged { timestamp_ns, .. } => *timestamp_ns,
        }
    }

    pub fn context_data(&self) -> &ContextData {
        match self {
            CaptureResult::Recorded { context_data, .. }
            | CaptureResult::Added { context_data, .. }
            | CaptureResult::Changed { context_data, .. }
            | CaptureResult::Unchanged { context_data, .. } => context_data,
        }
    }

    /// The image a report should show for this result
    pub fn report_file(&self) -> Option<&Path> {
        match self {
            CaptureResult::Added { .. } => self.actual_file().or(self.compare_file()),
            CaptureResult::Changed { .. } => self.compare_file().or(self.actual_file()),
            CaptureResult::Recorded { .. } | CaptureResult::Unchanged { .. } => self.golden_file(),
        }
    }

    /// Absolute path identifying this capture in a merged report.
    ///
    /// The golden path when present, otherwise the first saved artifact.
    pub fn merge_key(&self) -> Option<PathBuf> {
        self.golden_file()
            .or(self.actual_file())
            .or(self.compare_file())
            .map(|path| std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
    }

    /// Whether a verify run should fail on this result
    pub fn is_failure(&self) -> bool {
        matches!(self, CaptureResult::Added { .. } | CaptureResult::Changed { .. })
    }
}

/// Counts by category; always derived from a result list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total: usize,
    pub recorded: usize,
    pub added: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl ResultSummary {
    pub fn from_results(results: &[CaptureResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.total += 1;
            match result {
                CaptureResult::Recorded { .. } => summary.recorded += 1,
                CaptureResult::Added { .. } => summary.added += 1,
                CaptureResult::Changed { .. } => summary.changed += 1,
                CaptureResult::Unchanged { .. } => summary.unchanged += 1,
            }
            summary
        })
    }

    /// `total` equals the sum of the categories
    pub fn is_consistent(&self) -> bool {
        self.total == self.recorded + self.added + self.changed + self.unchanged
    }
}

/// A run-level report: summary plus the ordered results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureResults {
    #[serde(default)]
    pub summary: ResultSummary,
    pub results: Vec<CaptureResult>,
}

impl CaptureResults {
    /// Build a report, computing the summary from the results
    pub fn from_results(results: Vec<CaptureResult>) -> Self {
        Self {
            summary: ResultSummary::from_results(&results),
            results,
        }
    }

    /// Merge `incoming` into this report keyed by absolute golden file path.
    ///
    /// A result for a path already present replaces the old one in place;
    /// new paths and results without any path are appended in incoming order.
    pub fn merge(self, incoming: CaptureResults) -> Self {
        let mut results = self.results;
        let mut index: HashMap<PathBuf, usize> = results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.merge_key().map(|key| (key, i)))
            .collect();
        for result in incoming.results {
            match result.merge_key() {
                Some(key) => match index.get(&key) {
                    Some(&i) => results[i] = result,
                    None => {
                        index.insert(key, results.len());
                        results.push(result);
                    }
                },
                None => results.push(result),
            }
        }
        Self::from_results(results)
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// A verify run met a missing or changed golden
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyFailure {
    pub result: CaptureResult,
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let golden = display_path(self.result.golden_file());
        match &self.result {
            CaptureResult::Added { .. } => write!(
                f,
                "golden file {} was not found; see the actual image at {}",
                golden,
                display_path(self.result.actual_file())
            ),
            CaptureResult::Changed { .. } => write!(
                f,
                "{} changed; see the comparison at {}",
                golden,
                display_path(self.result.compare_file())
            ),
            _ => write!(f, "{} did not fail verification", golden),
        }
    }
}

fn display_path(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<unknown>".to_string(),
    }
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Error types for report operations
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON or a missing required field
    #[error("invalid report JSON{}: {source}", location(.path))]
    Json {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown type {0}")]
    UnknownType(String),

    #[error("failed to lock {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("verification failed: {0}")]
    Verification(VerifyFailure),
}

fn location(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

/// Serialize paths as absolute, read them back verbatim
mod absolute_path {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S: Serializer>(path: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error> {
        match path {
            Some(path) => {
                let absolute = std::path::absolute(path).unwrap_or_else(|_| path.clone());
                serializer.collect_str(&absolute.display())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PathBuf>, D::Error> {
        Option::<PathBuf>::deserialize(deserializer)
    }
}
