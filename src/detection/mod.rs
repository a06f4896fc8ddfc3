/// Change point detection and recency gating
pub mod detector;
pub mod energy;
pub mod recency;
pub mod statistics;

pub use detector::{
    filter_change_points_by_median_threshold, CandidateDetector, ChangePointDetector,
    DEFAULT_MEDIAN_THRESHOLD,
};
pub use energy::EDivisive;
pub use recency::{is_change_point_in_valid_window, DEFAULT_NUM_RUNS_IN_CHANGE_POINT_WINDOW};
pub use statistics::{median, relative_median_change};
