//! JSON encoding of capture results and run reports.
//!
//! Reading is lenient about formatting: trailing commas are accepted and
//! optional keys may be missing. It is strict about content. An unrecognized
//! `type` tag and a missing `timestamp` are both errors.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::types::{
    CaptureResult, CaptureResults, KNOWN_TYPES, ReportError, ReportResult, ResultSummary,
};

/// Drop commas that directly precede a closing `}` or `]`, leaving string
/// contents alone
pub fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

fn parse_value(json: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&strip_trailing_commas(json))
}

fn check_type_tag(value: &Value) -> ReportResult<()> {
    match value.get("type").and_then(Value::as_str) {
        Some(tag) if !KNOWN_TYPES.contains(&tag) => Err(ReportError::UnknownType(tag.to_string())),
        _ => Ok(()),
    }
}

fn json_error(source: serde_json::Error) -> ReportError {
    ReportError::Json { path: None, source }
}

/// Parse a single capture result
pub fn result_from_json(json: &str) -> ReportResult<CaptureResult> {
    let value = parse_value(json).map_err(json_error)?;
    check_type_tag(&value)?;
    serde_json::from_value(value).map_err(json_error)
}

/// Parse a run report. A stored summary is ignored and recomputed.
pub fn results_from_json(json: &str) -> ReportResult<CaptureResults> {
    let value = parse_value(json).map_err(json_error)?;
    if let Some(results) = value.get("results").and_then(Value::as_array) {
        for result in results {
            check_type_tag(result)?;
        }
    }
    let report: CaptureResults = serde_json::from_value(value).map_err(json_error)?;
    Ok(CaptureResults::from_results(report.results))
}

pub fn result_to_json(result: &CaptureResult) -> ReportResult<String> {
    serde_json::to_string_pretty(result).map_err(json_error)
}

/// Encode a report. The summary is recomputed from the results, never copied.
pub fn results_to_json(report: &CaptureResults) -> ReportResult<String> {
    #[derive(Serialize)]
    struct Document<'a> {
        summary: ResultSummary,
        results: &'a [CaptureResult],
    }

    let document = Document {
        summary: ResultSummary::from_results(&report.results),
        results: &report.results,
    };
    serde_json::to_string_pretty(&document).map_err(json_error)
}

fn read_text(path: &Path) -> ReportResult<String> {
    fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Attach the file path to JSON errors raised while reading it
fn in_file(path: &Path, err: ReportError) -> ReportError {
    match err {
        ReportError::Json { path: None, source } => ReportError::Json {
            path: Some(path.to_path_buf()),
            source,
        },
        other => other,
    }
}

pub fn read_result_file(path: &Path) -> ReportResult<CaptureResult> {
    result_from_json(&read_text(path)?).map_err(|e| in_file(path, e))
}

pub fn read_results_file(path: &Path) -> ReportResult<CaptureResults> {
    results_from_json(&read_text(path)?).map_err(|e| in_file(path, e))
}
