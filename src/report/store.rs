//! On-disk report files.
//!
//! Several test processes may flush into the same summary. Each merge holds an
//! exclusive advisory lock on a sibling `<report>.lock` for the whole
//! read-merge-write cycle, and the new document replaces the old one by
//! rename, so readers see either the previous or the next complete report.

use fs2::FileExt;
use log::debug;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use super::json::{read_result_file, read_results_file, result_to_json, results_to_json};
use super::types::{CaptureResult, CaptureResults, ReportError, ReportResult};
use crate::utils::write_atomically;

/// Path of the lock file guarding `report`
pub fn lock_path(report: &Path) -> PathBuf {
    let mut name = report.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Atomically replace `path` with `contents`
pub(crate) fn write_text(path: &Path, contents: &str) -> ReportResult<()> {
    write_atomically(path, contents.as_bytes()).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a report without merging
pub fn write_results_file(path: &Path, report: &CaptureResults) -> ReportResult<()> {
    write_text(path, &results_to_json(report)?)
}

/// Write one capture result as its own file
pub fn write_result_file(path: &Path, result: &CaptureResult) -> ReportResult<()> {
    write_text(path, &result_to_json(result)?)
}

/// Merge `incoming` into the report at `path` under the report lock.
///
/// A missing report counts as empty. Returns the merged report as written.
pub fn merge_into_file(path: &Path, incoming: CaptureResults) -> ReportResult<CaptureResults> {
    let lock = lock_path(path);
    if let Some(dir) = lock.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock)
        .map_err(|source| ReportError::Lock {
            path: lock.clone(),
            source,
        })?;
    FileExt::lock_exclusive(&lock_file).map_err(|source| ReportError::Lock {
        path: lock.clone(),
        source,
    })?;
    debug!("merge_into_file(): holding {}", lock.display());

    let existing = if path.exists() {
        read_results_file(path)?
    } else {
        CaptureResults::default()
    };
    let merged = existing.merge(incoming);
    let written = write_results_file(path, &merged);

    if let Err(err) = FileExt::unlock(&lock_file) {
        debug!("merge_into_file(): unlock of {} failed: {}", lock.display(), err);
    }
    written?;
    debug!(
        "merge_into_file(): {} now has {} results",
        path.display(),
        merged.results.len()
    );
    Ok(merged)
}

/// Read every per-capture `*.json` file in `dir`, ordered by timestamp
pub fn collect_results(dir: &Path) -> ReportResult<CaptureResults> {
    if !dir.is_dir() {
        debug!("collect_results(): {} does not exist", dir.display());
        return Ok(CaptureResults::default());
    }
    let entries = fs::read_dir(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut results = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") || !path.is_file() {
            continue;
        }
        results.push(read_result_file(&path)?);
    }
    results.sort_by_key(CaptureResult::timestamp_ns);
    Ok(CaptureResults::from_results(results))
}
