use crate::alerts::AlertRecord;
use crate::error::StoreError;
use log::{debug, info};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Default number of prior alerts read back for deduplication
pub const DEFAULT_MAX_PRIOR_ALERTS: usize = 10;

/// Append-only persistence for alert records, keyed by table name
#[cfg_attr(test, mockall::automock)]
pub trait AlertStore: Send + Sync {
    /// Read up to `limit` records from `table`, newest issue first
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TableNotFound` if nothing was ever written to
    /// `table`. An existing but empty table yields `Ok(vec![])`.
    fn read_recent(&self, table: &str, limit: usize) -> Result<Vec<AlertRecord>, StoreError>;

    /// Append one record to `table`, creating the table if needed
    fn append(&self, table: &str, record: &AlertRecord) -> Result<(), StoreError>;
}

/// Newest issue first, keeping at most `limit` records
fn most_recent(mut records: Vec<AlertRecord>, limit: usize) -> Vec<AlertRecord> {
    records.sort_by(|a, b| b.issue_timestamp.cmp(&a.issue_timestamp));
    records.truncate(limit);
    records
}

/// Alert store backed by one JSON Lines file per table
///
/// Table `t` lives at `<directory>/t.jsonl`, one serialized `AlertRecord` per line.
#[derive(Debug, Clone)]
pub struct JsonlAlertStore {
    directory: PathBuf,
}

impl JsonlAlertStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.directory.join(format!("{}.jsonl", table))
    }

    fn parse_table(path: &Path, contents: &str) -> Result<Vec<AlertRecord>, StoreError> {
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line_no, line)| {
                serde_json::from_str(line).map_err(|e| {
                    StoreError::DecodeError(format!(
                        "{} line {}: {}",
                        path.display(),
                        line_no + 1,
                        e
                    ))
                })
            })
            .collect()
    }
}

impl AlertStore for JsonlAlertStore {
    fn read_recent(&self, table: &str, limit: usize) -> Result<Vec<AlertRecord>, StoreError> {
        let path = self.table_path(table);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::TableNotFound(table.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let records = Self::parse_table(&path, &contents)?;
        debug!("Read {} alert record(s) from {}", records.len(), path.display());
        Ok(most_recent(records, limit))
    }

    fn append(&self, table: &str, record: &AlertRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.directory)?;

        let path = self.table_path(table);
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;

        info!(
            "Alert metadata for issue #{} is published to {}",
            record.issue_number,
            path.display()
        );
        Ok(())
    }
}

/// Alert store held in memory, used for dry runs and tests
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    tables: Mutex<HashMap<String, Vec<AlertRecord>>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records` in `table`
    pub fn with_records(table: &str, records: Vec<AlertRecord>) -> Self {
        let store = Self::new();
        store
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.to_string(), records);
        store
    }

    /// Number of records in `table`, 0 if it does not exist
    pub fn record_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map_or(0, Vec::len)
    }
}

impl AlertStore for InMemoryAlertStore {
    fn read_recent(&self, table: &str, limit: usize) -> Result<Vec<AlertRecord>, StoreError> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(table)
            .map(|records| most_recent(records.clone(), limit))
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    fn append(&self, table: &str, record: &AlertRecord) -> Result<(), StoreError> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        debug!("Stored alert record for issue #{} in memory", record.issue_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_record(issue_number: u64, age_days: i64) -> AlertRecord {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        AlertRecord {
            issue_timestamp: now - Duration::days(age_days),
            change_point_timestamp: now - Duration::days(age_days + 1),
            test_id: "wordcount_py".to_string(),
            test_name: Some("wordcount".to_string()),
            metric_name: "runtime".to_string(),
            change_point: 10.0 * issue_number as f64,
            issue_number,
            issue_url: format!("https://github.com/example/repo/issues/{}", issue_number),
        }
    }

    #[test]
    fn test_jsonl_missing_table_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = JsonlAlertStore::new(dir.path());

        let result = store.read_recent("never_written", 10);
        assert!(matches!(result, Err(StoreError::TableNotFound(table)) if table == "never_written"));
    }

    #[test]
    fn test_jsonl_missing_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = JsonlAlertStore::new(dir.path().join("does/not/exist"));

        assert!(matches!(
            store.read_recent("t", 10),
            Err(StoreError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_jsonl_unusable_directory_is_not_table_not_found() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = JsonlAlertStore::new(file.path());

        let result = store.read_recent("t", 10);
        assert!(
            matches!(result, Err(StoreError::IoError(_))),
            "expected io error, got {:?}",
            result
        );
        assert!(store.append("t", &create_test_record(1, 1)).is_err());
    }

    #[test]
    fn test_jsonl_table_that_is_a_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("t.jsonl")).unwrap();
        let store = JsonlAlertStore::new(dir.path());

        assert!(matches!(
            store.read_recent("t", 10),
            Err(StoreError::IoError(_))
        ));
    }

    #[test]
    fn test_jsonl_append_then_read_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = JsonlAlertStore::new(dir.path().join("alerts"));

        store.append("t", &create_test_record(1, 30)).unwrap();
        store.append("t", &create_test_record(3, 1)).unwrap();
        store.append("t", &create_test_record(2, 10)).unwrap();

        let records = store.read_recent("t", 10).unwrap();
        let numbers: Vec<u64> = records.iter().map(|r| r.issue_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[test]
    fn test_jsonl_read_respects_limit() {
        let dir = TempDir::new().unwrap();
        let store = JsonlAlertStore::new(dir.path());

        for i in 0..15 {
            store.append("t", &create_test_record(i, 100 - i as i64)).unwrap();
        }

        let records = store.read_recent("t", 10).unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].issue_number, 14);
        assert_eq!(records[9].issue_number, 5);
    }

    #[test]
    fn test_jsonl_empty_table_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("t.jsonl"), "\n").unwrap();
        let store = JsonlAlertStore::new(dir.path());

        assert!(store.read_recent("t", 10).unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_corrupt_line_reports_location() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("t.jsonl"), "{not json}\n").unwrap();
        let store = JsonlAlertStore::new(dir.path());

        match store.read_recent("t", 10) {
            Err(StoreError::DecodeError(message)) => assert!(message.contains("line 1")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryAlertStore::new();
        assert!(matches!(
            store.read_recent("t", 10),
            Err(StoreError::TableNotFound(_))
        ));

        store.append("t", &create_test_record(1, 5)).unwrap();
        store.append("t", &create_test_record(2, 2)).unwrap();

        assert_eq!(store.record_count("t"), 2);
        assert_eq!(store.record_count("other"), 0);

        let records = store.read_recent("t", 1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].issue_number, 2);
    }

    #[test]
    fn test_in_memory_with_records() {
        let store = InMemoryAlertStore::with_records("t", vec![create_test_record(7, 1)]);
        assert_eq!(store.read_recent("t", 10).unwrap()[0].issue_number, 7);
    }
}
