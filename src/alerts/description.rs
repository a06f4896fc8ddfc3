use crate::series::MetricSeries;

/// Default number of runs shown on each side of the change point
pub const DEFAULT_MAX_RESULTS_TO_DISPLAY: usize = 40;

/// Label attached to every alert issue
pub const DEFAULT_ALERT_LABEL: &str = "perf-alert";

const ANOMALY_MARKER: &str = " <---- Anomaly";

/// Details of a detected change point, as shown on the alert issue
#[derive(Debug, Clone, Copy)]
pub struct ChangePointReport<'a> {
    pub test_id: &'a str,
    pub test_name: Option<&'a str>,
    pub test_description: Option<&'a str>,
    pub metric_name: &'a str,
    pub series: &'a MetricSeries,
    pub change_point_index: usize,
}

/// Title of the alert issue for a test and metric
pub fn issue_title(test_id: &str, metric_name: &str) -> String {
    format!(
        "Performance Regression or Improvement: {}:{}",
        test_id, metric_name
    )
}

/// Format the body of an alert issue
///
/// Lists up to `max_results_to_display` runs on each side of the change point,
/// newest first, and marks the change point run.
pub fn issue_description(report: &ChangePointReport<'_>, max_results_to_display: usize) -> String {
    let mut description = format!(
        "Performance change found in the test: `{}` for the metric: `{}`.\n\n",
        report.test_id, report.metric_name
    );

    if let Some(test_name) = report.test_name {
        description.push_str(&format!("`test_name:` {}\n\n", test_name));
    }

    if let Some(test_description) = report.test_description {
        description.push_str(&format!("`Test description:` {}\n\n", test_description));
    }

    let values = report.series.values();
    let timestamps = report.series.timestamps();
    if values.is_empty() {
        return description.trim_end().to_string();
    }

    let last = values.len() - 1;
    let low = report
        .change_point_index
        .saturating_sub(max_results_to_display)
        .min(last);
    let high = report
        .change_point_index
        .saturating_add(max_results_to_display)
        .min(last);

    let rows: Vec<String> = (low..=high)
        .rev()
        .map(|i| {
            let mut row = format!(
                "timestamp: {}, metric_value: {:.2}",
                timestamps[i].to_rfc2822(),
                values[i]
            );
            if i == report.change_point_index {
                row.push_str(ANOMALY_MARKER);
            }
            row
        })
        .collect();

    description.push_str(&rows.join("\n"));
    description
}

/// Default labels followed by the test's own labels, without duplicates
pub fn merge_labels(defaults: &[String], extra: &[String]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(defaults.len() + extra.len());
    for label in defaults.iter().chain(extra) {
        if !labels.contains(label) {
            labels.push(label.clone());
        }
    }
    labels
}
