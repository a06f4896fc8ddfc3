/// Default number of most recent runs a change point must fall within
pub const DEFAULT_NUM_RUNS_IN_CHANGE_POINT_WINDOW: usize = 14;

/// Check whether a change point is recent enough to alert on
///
/// # Arguments
///
/// * `num_runs_in_change_point_window` - Size of the lookback window in runs
/// * `latest_change_point_run` - Runs between the change point and the latest
///   run, `(len - 1) - change_point_index`; 0 means the latest run
pub fn is_change_point_in_valid_window(
    num_runs_in_change_point_window: usize,
    latest_change_point_run: usize,
) -> bool {
    num_runs_in_change_point_window > latest_change_point_run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_run_is_in_window() {
        assert!(is_change_point_in_valid_window(1, 0));
        assert!(is_change_point_in_valid_window(14, 0));
    }

    #[test]
    fn test_window_edge() {
        assert!(is_change_point_in_valid_window(5, 4));
        assert!(!is_change_point_in_valid_window(4, 4));
        assert!(!is_change_point_in_valid_window(3, 4));
    }

    #[test]
    fn test_empty_window_rejects_everything() {
        assert!(!is_change_point_in_valid_window(0, 0));
    }
}
