/// Metric data sources
pub mod file_fetcher;

pub use file_fetcher::FileMetricsFetcher;

use crate::config::TestConfig;
use crate::error::FetchError;
use crate::series::MetricSeries;

/// Identifies the measurements to fetch for one test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    pub project: String,
    pub metrics_dataset: String,
    pub metrics_table: String,
    pub metric_name: String,
    pub test_name: Option<String>,
    /// Number of most recent runs to return
    pub limit: usize,
}

impl MetricQuery {
    pub fn for_test(test: &TestConfig, limit: usize) -> Self {
        Self {
            project: test.project.clone(),
            metrics_dataset: test.metrics_dataset.clone(),
            metrics_table: test.metrics_table.clone(),
            metric_name: test.metric_name.clone(),
            test_name: test.test_name.clone(),
            limit,
        }
    }
}

/// Trait for metric data sources
#[cfg_attr(test, mockall::automock)]
pub trait MetricsFetcher: Send + Sync {
    /// Fetch the `query.limit` most recent runs, returned ascending by timestamp
    fn fetch_metric_data(&self, query: &MetricQuery) -> Result<MetricSeries, FetchError>;
}
