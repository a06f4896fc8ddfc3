//! Per-test analysis pipeline and batch driver
//!
//! For each configured (test, metric) pair the analyzer fetches the recent
//! series, looks for the most recent significant change point, checks that it
//! falls inside the lookback window, compares it with earlier alerts and, if
//! it is new, reports it and records the alert.

pub mod summary;

pub use summary::BatchSummary;

use crate::alerts::{
    is_new_alert, issue_description, issue_title, merge_labels, sanitize_identifier,
    AlertRecord, AlertStore, ChangePointReport, IssueRef, IssueRequest, IssueTracker,
};
use crate::config::{AnalysisSettings, TestConfig};
use crate::detection::{is_change_point_in_valid_window, ChangePointDetector, EDivisive};
use crate::error::{AnalysisError, StoreError};
use crate::metrics::{MetricQuery, MetricsFetcher};
use crate::series::{MetricSeries, Timestamp};
use chrono::Utc;
use log::{error, info};
use std::collections::BTreeMap;

/// Result of analysing one test entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new change point was reported on this issue
    Alerted(IssueRef),
    NoChange(NoChangeReason),
    /// The change point was already reported by an earlier alert
    Suppressed,
}

impl Outcome {
    pub fn is_alert(&self) -> bool {
        matches!(self, Outcome::Alerted(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoChangeReason {
    NotDetected,
    /// The change point is `offset` runs old, not within the last `window` runs
    OutsideWindow { offset: usize, window: usize },
}

/// Runs the detection pipeline against injected collaborators
pub struct Analyzer {
    settings: AnalysisSettings,
    detector: ChangePointDetector,
    fetcher: Box<dyn MetricsFetcher>,
    store: Box<dyn AlertStore>,
    tracker: Box<dyn IssueTracker>,
}

impl Analyzer {
    /// Create an analyzer using E-Divisive configured from `settings`
    ///
    /// # Arguments
    ///
    /// * `settings` - Global analysis constants
    /// * `fetcher` - Source of metric series
    /// * `store` - Alert metadata store
    /// * `tracker` - Issue tracker receiving new alerts
    pub fn new(
        settings: AnalysisSettings,
        fetcher: Box<dyn MetricsFetcher>,
        store: Box<dyn AlertStore>,
        tracker: Box<dyn IssueTracker>,
    ) -> Self {
        let strategy = EDivisive::new(
            settings.pvalue,
            settings.permutations,
            settings.min_segment_size,
            settings.seed,
        );
        let detector = ChangePointDetector::new(Box::new(strategy), settings.median_threshold);

        Self {
            settings,
            detector,
            fetcher,
            store,
            tracker,
        }
    }

    /// Replace the change point detector
    pub fn with_detector(mut self, detector: ChangePointDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Validate a raw test entry and analyse it
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfig` if the entry is missing required
    /// keys or has malformed values, otherwise any error from `analyze_test`.
    pub fn analyze(&self, test_id: &str, entry: &toml::Table) -> Result<Outcome, AnalysisError> {
        let test = TestConfig::from_table(test_id, entry)?;
        self.analyze_test(&test)
    }

    /// Analyse one validated test entry
    ///
    /// # Errors
    ///
    /// Fetch, store and tracker failures end the analysis of this entry. A
    /// store that has never recorded an alert for the entry is not an error.
    pub fn analyze_test(&self, test: &TestConfig) -> Result<Outcome, AnalysisError> {
        let min_runs_between_change_points = test.min_runs_between_change_points(&self.settings);
        let num_runs_in_change_point_window = test.num_runs_in_change_point_window(&self.settings);

        let query = MetricQuery::for_test(test, self.settings.num_data_points);
        let series = self.fetcher.fetch_metric_data(&query)?;

        let Some(change_point_index) = self.detector.detect(series.values()) else {
            info!(
                "Performance alert is not triggered for test {} metric {}: no change point found in {} run(s)",
                test.test_id,
                test.metric_name,
                series.len()
            );
            return Ok(Outcome::NoChange(NoChangeReason::NotDetected));
        };

        let latest_change_point_run = series.runs_since(change_point_index);
        if !is_change_point_in_valid_window(
            num_runs_in_change_point_window,
            latest_change_point_run,
        ) {
            info!(
                "Performance alert is not triggered for test {} metric {}: change point is {} run(s) old, \
                 outside the window of the last {} run(s)",
                test.test_id,
                test.metric_name,
                latest_change_point_run,
                num_runs_in_change_point_window
            );
            return Ok(Outcome::NoChange(NoChangeReason::OutsideWindow {
                offset: latest_change_point_run,
                window: num_runs_in_change_point_window,
            }));
        }

        let table = test.alert_table();
        let existing_issue_number = match self
            .store
            .read_recent(&table, self.settings.max_prior_alerts)
        {
            Ok(records) => {
                let previous: Vec<Timestamp> = records
                    .iter()
                    .map(|record| record.change_point_timestamp)
                    .collect();
                if !is_new_alert(
                    &previous,
                    change_point_index,
                    series.timestamps(),
                    min_runs_between_change_points,
                ) {
                    info!(
                        "Performance alert is not triggered for test {} metric {}: change point at {} \
                         was already reported",
                        test.test_id,
                        test.metric_name,
                        series.timestamps()[change_point_index]
                    );
                    return Ok(Outcome::Suppressed);
                }
                records.first().map(|record| record.issue_number)
            }
            Err(StoreError::TableNotFound(_)) => {
                info!(
                    "No prior alerts recorded in {}, treating test {} as a first-time alert",
                    table, test.test_id
                );
                None
            }
            Err(e) => return Err(e.into()),
        };

        let issue = self.report(test, &series, change_point_index, existing_issue_number)?;

        let record = AlertRecord {
            issue_timestamp: Utc::now(),
            change_point_timestamp: series.timestamps()[change_point_index],
            test_id: sanitize_identifier(&test.test_id),
            test_name: test.test_name.clone(),
            metric_name: test.metric_name.clone(),
            change_point: series.values()[change_point_index],
            issue_number: issue.number,
            issue_url: issue.url.clone(),
        };
        self.store.append(&table, &record)?;

        info!(
            "Performance alert triggered for test {} metric {}: issue #{} {}",
            test.test_id, test.metric_name, issue.number, issue.url
        );
        Ok(Outcome::Alerted(issue))
    }

    fn report(
        &self,
        test: &TestConfig,
        series: &MetricSeries,
        change_point_index: usize,
        existing_issue_number: Option<u64>,
    ) -> Result<IssueRef, AnalysisError> {
        let report = ChangePointReport {
            test_id: &test.test_id,
            test_name: test.test_name.as_deref(),
            test_description: test.test_description.as_deref(),
            metric_name: &test.metric_name,
            series,
            change_point_index,
        };

        let request = IssueRequest {
            title: issue_title(&test.test_id, &test.metric_name),
            description: issue_description(&report, self.settings.max_results_to_display),
            labels: merge_labels(&self.settings.default_labels, &test.labels),
            existing_issue_number,
        };

        Ok(self.tracker.report(&request)?)
    }

    /// Analyse every entry in test id order
    ///
    /// A failing entry is logged and counted; the remaining entries still run.
    pub fn run_batch(&self, tests: &BTreeMap<String, toml::Table>) -> BatchSummary {
        let mut summary = BatchSummary::new();

        for (test_id, entry) in tests {
            info!("Analysing test {}", test_id);
            let result = self.analyze(test_id, entry);
            if let Err(e) = &result {
                error!("Analysis of test {} failed: {}", test_id, e);
            }
            summary.record(&result);
        }

        summary
    }
}
