//! Report file format and merge behavior.
//!
//! Run with: cargo test --test report_json

use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use snapdiff::report::{
    CaptureResult, CaptureResults, ContextData, ReportAggregator, ReportError, collect_results,
    merge_into_file, read_results_file, result_from_json, result_to_json, results_from_json,
    results_to_json, write_html_report, write_result_file,
};

fn changed(golden: &Path, ts: i64) -> CaptureResult {
    let mut context_data = ContextData::new();
    context_data.insert("theme".to_string(), Value::from("dark"));
    CaptureResult::Changed {
        compare_file: Some(golden.with_file_name("out_compare.png")),
        golden_file: Some(golden.to_path_buf()),
        actual_file: Some(golden.with_file_name("out_actual.png")),
        timestamp_ns: ts,
        diff_percentage: Some(2.5),
        context_data,
    }
}

fn recorded(golden: &Path, ts: i64) -> CaptureResult {
    CaptureResult::Recorded {
        golden_file: Some(golden.to_path_buf()),
        timestamp_ns: ts,
        context_data: ContextData::new(),
    }
}

#[test]
fn test_result_json_layout() {
    let result = changed(Path::new("/goldens/home.png"), 42);
    let value: Value = serde_json::from_str(&result_to_json(&result).unwrap()).unwrap();

    assert_eq!(value["type"], "changed");
    assert_eq!(value["golden_file_path"], "/goldens/home.png");
    assert_eq!(value["compare_file_path"], "/goldens/out_compare.png");
    assert_eq!(value["actual_file_path"], "/goldens/out_actual.png");
    assert_eq!(value["timestamp"], 42);
    assert_eq!(value["diff_percentage"], 2.5);
    assert_eq!(value["context_data"]["theme"], "dark");

    assert_eq!(result_from_json(&result_to_json(&result).unwrap()).unwrap(), result);
}

#[test]
fn test_relative_paths_are_written_absolute() {
    let result = recorded(Path::new("goldens/home.png"), 1);
    let value: Value = serde_json::from_str(&result_to_json(&result).unwrap()).unwrap();

    let written = PathBuf::from(value["golden_file_path"].as_str().unwrap());
    assert!(written.is_absolute());
    assert!(written.ends_with("goldens/home.png"));
    assert!(value.get("context_data").is_none());
}

#[test]
fn test_unknown_type_and_missing_timestamp() {
    let err = result_from_json(r#"{"type": "ignored", "golden_file_path": "/a.png", "timestamp": 1}"#)
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown type ignored");

    let err = result_from_json(r#"{"type": "recorded", "golden_file_path": "/a.png"}"#).unwrap_err();
    assert!(matches!(err, ReportError::Json { .. }));
}

#[test]
fn test_report_with_trailing_commas() {
    let json = r#"{
        "summary": {"total": 9, "recorded": 9, "added": 0, "changed": 0, "unchanged": 0,},
        "results": [
            {"type": "recorded", "golden_file_path": "/a.png", "timestamp": 1,},
            {"type": "unchanged", "golden_file_path": "/b,].png", "timestamp": 2},
        ],
    }"#;
    let report = results_from_json(json).unwrap();

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[1].golden_file(), Some(Path::new("/b,].png")));
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.recorded, 1);
    assert_eq!(report.summary.unchanged, 1);
}

#[test]
fn test_merge_replaces_by_golden_path() {
    let dir = TempDir::new().unwrap();
    let summary = dir.path().join("summary.json");
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");

    merge_into_file(&summary, CaptureResults::from_results(vec![recorded(&a, 1), recorded(&b, 2)]))
        .unwrap();
    let merged = merge_into_file(
        &summary,
        CaptureResults::from_results(vec![changed(&a, 3), recorded(&dir.path().join("c.png"), 4)]),
    )
    .unwrap();

    let names: Vec<&str> = merged.results.iter().map(CaptureResult::type_name).collect();
    assert_eq!(names, vec!["changed", "recorded", "recorded"]);
    assert_eq!(merged.summary.total, 3);
    assert_eq!(merged.summary.changed, 1);
    assert_eq!(merged.summary.recorded, 2);
    assert_eq!(read_results_file(&summary).unwrap(), merged);
}

#[test]
fn test_relative_golden_flushed_twice_is_one_entry() {
    let dir = TempDir::new().unwrap();
    let summary = dir.path().join("summary.json");
    let relative = Path::new("goldens/home.png");

    for ts in [1, 2] {
        let aggregator = ReportAggregator::new();
        aggregator.append(CaptureResult::Unchanged {
            golden_file: Some(relative.to_path_buf()),
            timestamp_ns: ts,
            context_data: ContextData::new(),
        });
        aggregator.flush(&summary).unwrap();
    }

    let on_disk = read_results_file(&summary).unwrap();
    assert_eq!(on_disk.summary.total, 1);
    assert_eq!(on_disk.results[0].timestamp_ns(), 2);
    assert_eq!(
        on_disk.results[0].golden_file(),
        Some(std::path::absolute(relative).unwrap().as_path())
    );
}

#[test]
fn test_added_without_golden_merges_by_actual_path() {
    let dir = TempDir::new().unwrap();
    let summary = dir.path().join("summary.json");
    let json = r#"{"type":"added","actual_file_path":"/o/a_actual.png","compare_file_path":"/o/a_compare.png","timestamp":5}"#;
    let added = result_from_json(json).unwrap();
    assert_eq!(added.golden_file(), None);

    merge_into_file(&summary, CaptureResults::from_results(vec![added.clone()])).unwrap();
    let merged = merge_into_file(&summary, CaptureResults::from_results(vec![added])).unwrap();

    assert_eq!(merged.summary.total, 1);
    assert_eq!(merged.summary.added, 1);
    let value: Value = serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert!(value["results"][0].get("golden_file_path").is_none());
}

#[test]
fn test_aggregator_flush_and_collect() {
    let dir = TempDir::new().unwrap();
    let results_dir = dir.path().join("results");
    let golden = dir.path().join("home.png");

    write_result_file(&results_dir.join("2_home.json"), &changed(&golden, 2)).unwrap();
    write_result_file(&results_dir.join("1_home.json"), &recorded(&golden, 1)).unwrap();
    fs::write(results_dir.join("notes.txt"), "not a result").unwrap();

    let collected = collect_results(&results_dir).unwrap();
    let timestamps: Vec<i64> = collected.results.iter().map(CaptureResult::timestamp_ns).collect();
    assert_eq!(timestamps, vec![1, 2]);

    let aggregator = ReportAggregator::new();
    for result in collected.results {
        aggregator.append(result);
    }
    let flushed = aggregator.flush(&dir.path().join("summary.json")).unwrap();

    // Same golden twice: the later result wins
    assert_eq!(flushed.results.len(), 1);
    assert_eq!(flushed.results[0].type_name(), "changed");
}

#[test]
fn test_html_report_lists_categories() {
    let dir = TempDir::new().unwrap();
    let report = CaptureResults::from_results(vec![
        changed(&dir.path().join("goldens/home.png"), 1),
        recorded(&dir.path().join("goldens/<settings>.png"), 2),
    ]);
    let html_path = dir.path().join("index.html");

    write_html_report(&html_path, &report).unwrap();

    let html = fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("Changed images"));
    assert!(html.contains("Recorded images"));
    assert!(html.contains("goldens/out_compare.png"));
    assert!(html.contains("&lt;settings&gt;.png"));
    assert!(html.contains("dark"));
    assert!(!html.contains(&dir.path().display().to_string()));
    assert_eq!(results_from_json(&results_to_json(&report).unwrap()).unwrap(), report);
}

#[test]
fn test_summary_counts_appended_results() {
    let aggregator = ReportAggregator::new();
    for i in 0..3 {
        aggregator.append(CaptureResult::Unchanged {
            golden_file: Some(PathBuf::from(format!("/g/unchanged_{}.png", i))),
            timestamp_ns: i,
            context_data: ContextData::new(),
        });
    }
    aggregator.append(changed(Path::new("/g/changed_0.png"), 3));
    aggregator.append(changed(Path::new("/g/changed_1.png"), 4));
    aggregator.append(CaptureResult::Added {
        compare_file: Some(PathBuf::from("/out/added_compare.png")),
        actual_file: Some(PathBuf::from("/out/added_actual.png")),
        golden_file: Some(PathBuf::from("/g/added.png")),
        timestamp_ns: 5,
        context_data: ContextData::new(),
    });

    let json = results_to_json(&aggregator.results()).unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(
        value["summary"],
        serde_json::json!({"total": 6, "recorded": 0, "added": 1, "changed": 2, "unchanged": 3})
    );
}
