//! Robust segment comparison for change point filtering
//!
//! Energy statistics react to small fluctuations as readily as to real shifts.
//! Comparing the medians on either side of a candidate split tells the two apart.

/// Added to the left median so an all-zero baseline does not divide by zero
pub const MEDIAN_EPSILON: f64 = 1e-10;

/// Median of a slice, or `None` if it is empty
///
/// Even-length slices yield the mean of the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Relative change between the medians of `values[..idx]` and `values[idx..]`
///
/// Computes `|right - left| / (left + MEDIAN_EPSILON)`.
///
/// # Returns
///
/// `None` when either segment would be empty (`idx == 0` or `idx >= len`)
pub fn relative_median_change(values: &[f64], idx: usize) -> Option<f64> {
    if idx == 0 || idx >= values.len() {
        return None;
    }

    let left = median(&values[..idx])?;
    let right = median(&values[idx..])?;

    Some((right - left).abs() / (left + MEDIAN_EPSILON))
}
