use crate::series::Timestamp;

/// Default number of runs on either side of a change point treated as the same event
pub const DEFAULT_MIN_RUNS_BETWEEN_CHANGE_POINTS: usize = 3;

/// Inclusive time range around a change point in which an earlier alert counts as a duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl SiblingWindow {
    /// Window spanning `min_runs_between_change_points` runs on each side of the change point
    ///
    /// Both ends are clamped to the series. `timestamps` must be ascending.
    ///
    /// # Returns
    ///
    /// `None` if `timestamps` is empty or `change_point_index` is past its end
    pub fn around(
        change_point_index: usize,
        timestamps: &[Timestamp],
        min_runs_between_change_points: usize,
    ) -> Option<Self> {
        if change_point_index >= timestamps.len() {
            return None;
        }

        let low = change_point_index.saturating_sub(min_runs_between_change_points);
        let high = change_point_index
            .saturating_add(min_runs_between_change_points)
            .min(timestamps.len() - 1);

        Some(Self {
            start: timestamps[low],
            end: timestamps[high],
        })
    }

    pub fn contains(&self, timestamp: &Timestamp) -> bool {
        self.start <= *timestamp && *timestamp <= self.end
    }
}

/// Decide whether a change point has not been reported before
///
/// # Arguments
///
/// * `previous_change_point_timestamps` - Change point timestamps of earlier alerts
/// * `change_point_index` - Index of the new change point in `timestamps`
/// * `timestamps` - Run timestamps of the analysed series, ascending
/// * `min_runs_between_change_points` - Half-width of the duplicate window in runs
///
/// # Returns
///
/// `false` if any previous timestamp falls inside the sibling window of the new
/// change point, `true` otherwise
pub fn is_new_alert(
    previous_change_point_timestamps: &[Timestamp],
    change_point_index: usize,
    timestamps: &[Timestamp],
    min_runs_between_change_points: usize,
) -> bool {
    let Some(window) =
        SiblingWindow::around(change_point_index, timestamps, min_runs_between_change_points)
    else {
        return true;
    };

    !previous_change_point_timestamps
        .iter()
        .any(|previous| window.contains(previous))
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn prop_duplicate_iff_previous_run_in_neighbourhood(
        len: u8,
        idx: u8,
        min_runs: u8,
        previous_runs: Vec<u8>,
    ) -> bool {
        let len = (len as usize % 60) + 1;
        let idx = idx as usize % len;
        let min_runs = min_runs as usize % 10;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps: Vec<Timestamp> = (0..len)
            .map(|i| start + Duration::hours(i as i64))
            .collect();

        let previous_runs: Vec<usize> = previous_runs.into_iter().map(|r| r as usize % len).collect();
        let previous: Vec<Timestamp> = previous_runs.iter().map(|&r| timestamps[r]).collect();

        let low = idx.saturating_sub(min_runs);
        let high = (idx + min_runs).min(len - 1);
        let expected_duplicate = previous_runs.iter().any(|&r| low <= r && r <= high);

        is_new_alert(&previous, idx, &timestamps, min_runs) != expected_duplicate
    }
}
