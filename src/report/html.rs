//! Static HTML rendering of a run report.
//!
//! Image links are relative to the directory the page is written to, so the
//! report can be moved together with the build outputs.

use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use super::store::write_text;
use super::types::{CaptureResult, CaptureResults, ReportResult, ResultSummary};

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>snapdiff report</title>
<style>
body { font-family: sans-serif; margin: 2em; }
table { border-collapse: collapse; margin-bottom: 2em; width: 100%; }
th, td { border: 1px solid #ccc; padding: 6px; text-align: left; vertical-align: top; }
td.file { word-break: break-all; width: 35%; }
td.file h6 { color: #666; margin: 0 0 4px 0; font-weight: normal; }
img { max-width: 100%; }
.context td { border: none; padding: 2px 8px 2px 0; }
</style>
</head>
<body>
<h1>snapdiff report</h1>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// Escape text for use in element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `path` expressed relative to `base`. Both are made absolute first.
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let base = std::path::absolute(base).unwrap_or_else(|_| base.to_path_buf());
    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return path;
    }

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

fn summary_table(summary: &ResultSummary) -> String {
    format!(
        "<h3>Summary</h3>\n<table class=\"summary\">\n\
         <thead><tr><th>Total</th><th>Recorded</th><th>Added</th><th>Changed</th><th>Unchanged</th></tr></thead>\n\
         <tbody><tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr></tbody>\n</table>\n",
        summary.total, summary.recorded, summary.added, summary.changed, summary.unchanged
    )
}

fn result_row(result: &CaptureResult, report_dir: &Path) -> String {
    let relative = result
        .report_file()
        .map(|path| relative_path(path, report_dir))
        .unwrap_or_default();
    let dirs = relative
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let src = relative.display().to_string().replace('\\', "/");

    let mut row = String::new();
    let _ = write!(
        row,
        "<tr><td class=\"file\"><h6>{}</h6>{}",
        escape_html(&dirs),
        escape_html(&name)
    );
    if !result.context_data().is_empty() {
        row.push_str("<table class=\"context\"><tbody>");
        for (key, value) in result.context_data() {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let _ = write!(
                row,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape_html(key),
                escape_html(&value)
            );
        }
        row.push_str("</tbody></table>");
    }
    if src.is_empty() {
        row.push_str("</td><td></td></tr>\n");
    } else {
        let _ = write!(
            row,
            "</td><td><img src=\"{}\" alt=\"{}\" loading=\"lazy\"></td></tr>\n",
            escape_html(&src),
            escape_html(&name)
        );
    }
    row
}

fn category_table(title: &str, anchor: &str, results: &[&CaptureResult], report_dir: &Path) -> String {
    if results.is_empty() {
        return String::new();
    }
    let mut table = format!(
        "<h3>{} ({})</h3>\n<table id=\"{}\">\n<thead><tr><th>File Name</th><th>Image</th></tr></thead>\n<tbody>\n",
        escape_html(title),
        results.len(),
        anchor
    );
    for result in results {
        table.push_str(&result_row(result, report_dir));
    }
    table.push_str("</tbody>\n</table>\n");
    table
}

impl CaptureResults {
    /// Render the report body: summary, then one table per category
    pub fn to_html(&self, report_dir: &Path) -> String {
        let summary = ResultSummary::from_results(&self.results);
        let by_type = |tag: &str| -> Vec<&CaptureResult> {
            self.results.iter().filter(|r| r.type_name() == tag).collect()
        };

        let mut html = summary_table(&summary);
        for (title, anchor) in [
            ("Recorded images", "recorded"),
            ("Added images", "added"),
            ("Changed images", "changed"),
            ("Unchanged images", "unchanged"),
        ] {
            html.push_str(&category_table(title, anchor, &by_type(anchor), report_dir));
        }
        html
    }
}

/// Write a complete HTML page for `report` to `path`
pub fn write_html_report(path: &Path, report: &CaptureResults) -> ReportResult<()> {
    let report_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let page = format!("{}{}{}", PAGE_HEAD, report.to_html(report_dir), PAGE_TAIL);
    write_text(path, &page)
}
