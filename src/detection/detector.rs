use crate::detection::statistics::relative_median_change;
use crate::detection::EDivisive;
use log::debug;

/// Default minimum relative median change for a candidate to count
pub const DEFAULT_MEDIAN_THRESHOLD: f64 = 0.05;

/// Strategy that proposes raw change point indices for a series
///
/// Implementations may return any number of indices, in any order, including
/// the boundaries `0` and `values.len()`. The detector filters them.
#[cfg_attr(test, mockall::automock)]
pub trait CandidateDetector: Send + Sync {
    /// Propose split indices for `values`
    fn candidates(&self, values: &[f64]) -> Vec<usize>;

    /// Get a human-readable name for this strategy
    fn name(&self) -> &str;
}

/// Finds the most recent practically significant change point in a series
pub struct ChangePointDetector {
    strategy: Box<dyn CandidateDetector>,
    median_threshold: f64,
}

impl Default for ChangePointDetector {
    fn default() -> Self {
        Self::new(Box::new(EDivisive::default()), DEFAULT_MEDIAN_THRESHOLD)
    }
}

impl ChangePointDetector {
    /// Create a detector around a candidate strategy
    ///
    /// # Arguments
    ///
    /// * `strategy` - Algorithm proposing raw split indices
    /// * `median_threshold` - Relative median change a candidate must exceed
    pub fn new(strategy: Box<dyn CandidateDetector>, median_threshold: f64) -> Self {
        Self {
            strategy,
            median_threshold,
        }
    }

    /// Return the rightmost candidate that survives the median filter
    pub fn detect(&self, values: &[f64]) -> Option<usize> {
        let candidates = self.strategy.candidates(values);
        debug!(
            "{} proposed {} candidate(s): {:?}",
            self.strategy.name(),
            candidates.len(),
            candidates
        );

        let significant =
            filter_change_points_by_median_threshold(values, &candidates, self.median_threshold);
        debug!(
            "{} candidate(s) exceed median threshold {}: {:?}",
            significant.len(),
            self.median_threshold,
            significant
        );

        significant.into_iter().max()
    }
}

/// Keep candidates whose relative median change exceeds `threshold`
///
/// Boundary candidates (`0` and `values.len()`) carry no information and are
/// always dropped, as is anything past the end of the series.
pub fn filter_change_points_by_median_threshold(
    values: &[f64],
    candidates: &[usize],
    threshold: f64,
) -> Vec<usize> {
    candidates
        .iter()
        .copied()
        .filter(|&idx| {
            relative_median_change(values, idx).is_some_and(|change| change > threshold)
        })
        .collect()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn prop_filter_is_monotone_in_threshold(
        values: Vec<u8>,
        candidates: Vec<u8>,
        low: u8,
        bump: u8,
    ) -> bool {
        let values: Vec<f64> = values.into_iter().map(|v| f64::from(v) + 1.0).collect();
        let candidates: Vec<usize> = candidates.into_iter().map(usize::from).collect();
        let low = f64::from(low) / 100.0;
        let high = low + f64::from(bump) / 100.0;

        let at_low = filter_change_points_by_median_threshold(&values, &candidates, low);
        let at_high = filter_change_points_by_median_threshold(&values, &candidates, high);

        at_high.len() <= at_low.len() && at_high.iter().all(|idx| at_low.contains(idx))
    }

    #[quickcheck]
    fn prop_detected_index_is_interior(values: Vec<u8>, candidates: Vec<u8>) -> bool {
        let values: Vec<f64> = values.into_iter().map(f64::from).collect();
        let candidates: Vec<usize> = candidates.into_iter().map(usize::from).collect();

        let mut strategy = MockCandidateDetector::new();
        strategy.expect_candidates().return_const(candidates);
        strategy.expect_name().return_const("mock".to_string());
        let detector = ChangePointDetector::new(Box::new(strategy), DEFAULT_MEDIAN_THRESHOLD);

        match detector.detect(&values) {
            Some(idx) => idx > 0 && idx < values.len(),
            None => true,
        }
    }
}
