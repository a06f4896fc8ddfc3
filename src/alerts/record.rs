use crate::series::Timestamp;
use serde::{Deserialize, Serialize};

/// Durable trace of an emitted performance alert
///
/// One record is appended per alert and never modified. Later runs read the
/// records back to avoid reporting the same change point twice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRecord {
    /// When the issue was created or commented on
    pub issue_timestamp: Timestamp,
    /// Submission time of the run at the change point
    pub change_point_timestamp: Timestamp,
    /// Test identifier, sanitized for use in storage identifiers
    pub test_id: String,
    /// Optional qualifier selecting one test from a shared metrics table
    pub test_name: Option<String>,
    pub metric_name: String,
    /// Metric value at the change point
    pub change_point: f64,
    pub issue_number: u64,
    pub issue_url: String,
}

/// Replace every character that is not ASCII alphanumeric or `_` with `_`
///
/// Storage backends reject dots, dashes and spaces in table names.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Name of the table holding alert records for a (metrics table, metric) pair
pub fn alert_table_name(metrics_table: &str, metric_name: &str) -> String {
    sanitize_identifier(&format!("{}_{}", metrics_table, metric_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("python.wordcount-batch"), "python_wordcount_batch");
        assert_eq!(sanitize_identifier("already_clean_42"), "already_clean_42");
        assert_eq!(sanitize_identifier("a b/c"), "a_b_c");
    }

    #[test]
    fn test_alert_table_name() {
        assert_eq!(
            alert_table_name("wordcount_py_batch", "runtime.sec"),
            "wordcount_py_batch_runtime_sec"
        );
    }

    #[test]
    fn test_alert_record_serialization() {
        let record = AlertRecord {
            issue_timestamp: Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap(),
            change_point_timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
            test_id: "wordcount_py".to_string(),
            test_name: None,
            metric_name: "runtime".to_string(),
            change_point: 123.5,
            issue_number: 42,
            issue_url: "https://github.com/example/repo/issues/42".to_string(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"issue_number\":42"));

        let deserialized: AlertRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deserialized);
    }
}
