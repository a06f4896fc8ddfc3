use crate::error::FetchError;
use crate::metrics::{MetricQuery, MetricsFetcher};
use crate::series::{MetricSeries, Timestamp};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::PathBuf;

/// One benchmark result row
#[derive(Debug, Deserialize)]
struct MetricRow {
    /// Name of the measured metric; matched by substring against the query
    metric_type: String,
    value: f64,
    submit_timestamp: Timestamp,
    #[serde(default)]
    test_name: Option<String>,
}

/// Reads benchmark results exported as JSON Lines
///
/// Rows for `project.dataset.table` live in
/// `<root>/<project>/<dataset>/<table>.jsonl`, one object per line with
/// `metric_type`, `value`, `submit_timestamp` (RFC 3339) and an optional
/// `test_name`.
#[derive(Debug, Clone)]
pub struct FileMetricsFetcher {
    root: PathBuf,
}

impl FileMetricsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_path(&self, query: &MetricQuery) -> PathBuf {
        self.root
            .join(&query.project)
            .join(&query.metrics_dataset)
            .join(format!("{}.jsonl", query.metrics_table))
    }

    fn matches(row: &MetricRow, query: &MetricQuery) -> bool {
        row.metric_type.contains(&query.metric_name)
            && query
                .test_name
                .as_ref()
                .map_or(true, |name| row.test_name.as_ref() == Some(name))
    }
}

impl MetricsFetcher for FileMetricsFetcher {
    fn fetch_metric_data(&self, query: &MetricQuery) -> Result<MetricSeries, FetchError> {
        let path = self.table_path(query);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FetchError::SourceNotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let mut rows = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: MetricRow = serde_json::from_str(line).map_err(|e| {
                FetchError::ParseError(format!("{} line {}: {}", path.display(), line_no + 1, e))
            })?;
            if Self::matches(&row, query) {
                rows.push(row);
            }
        }

        // Newest first, keep the most recent runs, then hand back in ascending order
        rows.sort_by(|a, b| b.submit_timestamp.cmp(&a.submit_timestamp));
        rows.truncate(query.limit);

        debug!(
            "Fetched {} run(s) of {} from {}",
            rows.len(),
            query.metric_name,
            path.display()
        );

        Ok(MetricSeries::from_points(
            rows.into_iter()
                .map(|row| (row.submit_timestamp, row.value))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_query(limit: usize, test_name: Option<&str>) -> MetricQuery {
        MetricQuery {
            project: "proj".to_string(),
            metrics_dataset: "dataset".to_string(),
            metrics_table: "table".to_string(),
            metric_name: "runtime".to_string(),
            test_name: test_name.map(str::to_string),
            limit,
        }
    }

    fn write_rows(dir: &TempDir, rows: &[serde_json::Value]) {
        let table_dir = dir.path().join("proj").join("dataset");
        std::fs::create_dir_all(&table_dir).unwrap();
        let body: Vec<String> = rows.iter().map(|row| row.to_string()).collect();
        std::fs::write(table_dir.join("table.jsonl"), body.join("\n")).unwrap();
    }

    fn row(metric_type: &str, value: f64, day: i64, test_name: Option<&str>) -> serde_json::Value {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        serde_json::json!({
            "metric_type": metric_type,
            "value": value,
            "submit_timestamp": (start + Duration::days(day)).to_rfc3339(),
            "test_name": test_name,
        })
    }

    #[test]
    fn test_missing_table() {
        let dir = TempDir::new().unwrap();
        let fetcher = FileMetricsFetcher::new(dir.path());

        assert!(matches!(
            fetcher.fetch_metric_data(&create_test_query(100, None)),
            Err(FetchError::SourceNotFound(_))
        ));
    }

    #[test]
    fn test_unreadable_source_is_io_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let fetcher = FileMetricsFetcher::new(file.path());

        let result = fetcher.fetch_metric_data(&create_test_query(100, None));
        assert!(
            matches!(result, Err(FetchError::IoError(_))),
            "expected io error, got {:?}",
            result
        );
    }

    #[test]
    fn test_rows_returned_ascending() {
        let dir = TempDir::new().unwrap();
        write_rows(
            &dir,
            &[
                row("runtime", 3.0, 3, None),
                row("runtime", 1.0, 1, None),
                row("runtime", 2.0, 2, None),
            ],
        );

        let series = FileMetricsFetcher::new(dir.path())
            .fetch_metric_data(&create_test_query(100, None))
            .unwrap();

        assert_eq!(series.values(), &[1.0, 2.0, 3.0]);
        assert!(series.timestamps().windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_limit_keeps_most_recent_runs() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<serde_json::Value> = (0..10)
            .map(|day| row("runtime", day as f64, day, None))
            .collect();
        write_rows(&dir, &rows);

        let series = FileMetricsFetcher::new(dir.path())
            .fetch_metric_data(&create_test_query(3, None))
            .unwrap();

        assert_eq!(series.values(), &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_metric_substring_and_test_name_filter() {
        let dir = TempDir::new().unwrap();
        write_rows(
            &dir,
            &[
                row("python_runtime_sec", 1.0, 1, Some("wordcount")),
                row("python_runtime_sec", 2.0, 2, Some("grep")),
                row("memory_usage", 3.0, 3, Some("wordcount")),
                row("runtime", 4.0, 4, None),
            ],
        );
        let fetcher = FileMetricsFetcher::new(dir.path());

        let all = fetcher
            .fetch_metric_data(&create_test_query(100, None))
            .unwrap();
        assert_eq!(all.values(), &[1.0, 2.0, 4.0]);

        let wordcount = fetcher
            .fetch_metric_data(&create_test_query(100, Some("wordcount")))
            .unwrap();
        assert_eq!(wordcount.values(), &[1.0]);
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let dir = TempDir::new().unwrap();
        let table_dir = dir.path().join("proj").join("dataset");
        std::fs::create_dir_all(&table_dir).unwrap();
        std::fs::write(table_dir.join("table.jsonl"), "\n{\"metric_type\": 1}\n").unwrap();

        match FileMetricsFetcher::new(dir.path()).fetch_metric_data(&create_test_query(10, None)) {
            Err(FetchError::ParseError(message)) => assert!(message.contains("line 2")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
