pub mod comparator;
pub mod diff;
pub mod types;

pub use comparator::{ImageComparator, SimpleImageComparator, normalize_transparent};
pub use diff::{
    ComparisonLayout, ComparisonParameters, DIFF_COLOR, GRID_MARGIN_DP, generate_compare_canvas,
    generate_diff_image,
};
pub use types::{
    ComparisonResult, ComparisonStyle, DEFAULT_BIG_LINE_SPACE_DP, DEFAULT_SMALL_LINE_SPACE_DP,
    ThresholdValidator,
};
