//! Core series types for change point analysis
//!
//! A metric series is the unit of work for the detector: one value per benchmark
//! run, paired with the time the run's result was submitted.

use crate::error::SeriesError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Benchmark measurements for one (test, metric) pair, ascending by timestamp
///
/// The pairing between `values[i]` and `timestamps[i]` is fixed at construction
/// and the order is never changed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSeries {
    values: Vec<f64>,
    timestamps: Vec<Timestamp>,
}

impl MetricSeries {
    /// Create a series from parallel value and timestamp vectors
    ///
    /// # Errors
    ///
    /// Returns `SeriesError::LengthMismatch` if the vectors differ in length and
    /// `SeriesError::NotAscending` if a timestamp is earlier than its predecessor.
    pub fn new(values: Vec<f64>, timestamps: Vec<Timestamp>) -> Result<Self, SeriesError> {
        if values.len() != timestamps.len() {
            return Err(SeriesError::LengthMismatch {
                values: values.len(),
                timestamps: timestamps.len(),
            });
        }

        if let Some(pos) = timestamps.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(SeriesError::NotAscending(pos + 1));
        }

        Ok(Self { values, timestamps })
    }

    /// Build a series from (timestamp, value) points in any order
    ///
    /// Points are sorted ascending by timestamp. The sort is stable, so points
    /// sharing a timestamp keep their relative order.
    pub fn from_points(mut points: Vec<(Timestamp, f64)>) -> Self {
        points.sort_by_key(|(timestamp, _)| *timestamp);
        let (timestamps, values) = points.into_iter().unzip();
        Self { values, timestamps }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of runs between `index` and the latest run (0 = latest run)
    pub fn runs_since(&self, index: usize) -> usize {
        self.len().saturating_sub(1).saturating_sub(index)
    }
}
