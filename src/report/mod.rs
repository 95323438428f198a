pub mod html;
pub mod json;
pub mod reporter;
pub mod store;
pub mod types;

pub use html::{escape_html, relative_path, write_html_report};
pub use json::{
    read_result_file, read_results_file, result_from_json, result_to_json, results_from_json,
    results_to_json, strip_trailing_commas,
};
pub use reporter::{
    CaptureResultReporter, DefaultReporter, JsonOutputReporter, ReportAggregator, VerifyReporter,
    result_file_name,
};
pub use store::{collect_results, lock_path, merge_into_file, write_result_file, write_results_file};
pub use types::{
    CaptureResult, CaptureResults, ContextData, KNOWN_TYPES, ReportError, ReportResult,
    ResultSummary, VerifyFailure,
};
