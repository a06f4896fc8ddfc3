use crate::alerts::alert_table_name;
use crate::config::AnalysisSettings;
use crate::error::ConfigError;
use serde::Deserialize;

/// Keys every test entry must define
pub const REQUIRED_TEST_KEYS: [&str; 4] =
    ["project", "metrics_dataset", "metrics_table", "metric_name"];

#[derive(Debug, Deserialize)]
struct RawTestConfig {
    project: String,
    metrics_dataset: String,
    metrics_table: String,
    metric_name: String,
    #[serde(default)]
    test_name: Option<String>,
    #[serde(default)]
    test_description: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    min_runs_between_change_points: Option<usize>,
    #[serde(default)]
    num_runs_in_change_point_window: Option<usize>,
}

/// Validated parameters for analysing one (test, metric) pair
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfig {
    pub test_id: String,
    pub project: String,
    pub metrics_dataset: String,
    pub metrics_table: String,
    pub metric_name: String,
    /// Selects a single test from a metrics table shared by several tests
    pub test_name: Option<String>,
    pub test_description: Option<String>,
    pub labels: Vec<String>,
    pub min_runs_between_change_points: Option<usize>,
    pub num_runs_in_change_point_window: Option<usize>,
}

impl TestConfig {
    /// Validate a raw `[tests.<test_id>]` table
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingKeys` listing every absent required key, and
    /// `ConfigError::ParseError` if a present key has the wrong type.
    pub fn from_table(test_id: &str, table: &toml::Table) -> Result<Self, ConfigError> {
        let missing: Vec<String> = REQUIRED_TEST_KEYS
            .iter()
            .filter(|key| !table.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys {
                test_id: test_id.to_string(),
                missing,
            });
        }

        let raw: RawTestConfig = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| {
                ConfigError::ParseError(format!("test {}: {}", test_id, e))
            })?;

        if raw.num_runs_in_change_point_window == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "test {}: num_runs_in_change_point_window must be greater than 0",
                test_id
            )));
        }

        Ok(Self {
            test_id: test_id.to_string(),
            project: raw.project,
            metrics_dataset: raw.metrics_dataset,
            metrics_table: raw.metrics_table,
            metric_name: raw.metric_name,
            test_name: raw.test_name,
            test_description: raw.test_description,
            labels: raw.labels,
            min_runs_between_change_points: raw.min_runs_between_change_points,
            num_runs_in_change_point_window: raw.num_runs_in_change_point_window,
        })
    }

    /// Run distance between distinct alerts, falling back to the global default
    pub fn min_runs_between_change_points(&self, settings: &AnalysisSettings) -> usize {
        self.min_runs_between_change_points
            .unwrap_or(settings.min_runs_between_change_points)
    }

    /// Recency window size, falling back to the global default
    pub fn num_runs_in_change_point_window(&self, settings: &AnalysisSettings) -> usize {
        self.num_runs_in_change_point_window
            .unwrap_or(settings.num_runs_in_change_point_window)
    }

    /// Table holding this test's alert records
    pub fn alert_table(&self) -> String {
        alert_table_name(&self.metrics_table, &self.metric_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_table(body: &str) -> toml::Table {
        body.parse::<toml::Table>().unwrap()
    }

    #[test]
    fn test_minimal_entry() {
        let table = parse_table(
            r#"
            project = "apache-beam-testing"
            metrics_dataset = "beam_run_inference"
            metrics_table = "torch_inference_imagenet"
            metric_name = "mean_inference_batch_latency_micro_secs"
            "#,
        );

        let test = TestConfig::from_table("torch.imagenet", &table).unwrap();
        assert_eq!(test.test_id, "torch.imagenet");
        assert_eq!(test.metric_name, "mean_inference_batch_latency_micro_secs");
        assert_eq!(test.test_name, None);
        assert!(test.labels.is_empty());
        assert_eq!(
            test.alert_table(),
            "torch_inference_imagenet_mean_inference_batch_latency_micro_secs"
        );
    }

    #[test]
    fn test_full_entry() {
        let table = parse_table(
            r#"
            project = "p"
            metrics_dataset = "d"
            metrics_table = "t"
            metric_name = "runtime"
            test_name = "wordcount"
            test_description = "Word count on 1GB"
            labels = ["python", "batch"]
            min_runs_between_change_points = 5
            num_runs_in_change_point_window = 7
            "#,
        );

        let test = TestConfig::from_table("wordcount", &table).unwrap();
        assert_eq!(test.test_name.as_deref(), Some("wordcount"));
        assert_eq!(test.labels, vec!["python", "batch"]);

        let settings = AnalysisSettings::default();
        assert_eq!(test.min_runs_between_change_points(&settings), 5);
        assert_eq!(test.num_runs_in_change_point_window(&settings), 7);
    }

    #[test]
    fn test_defaults_resolved_from_settings() {
        let table = parse_table(
            "project = \"p\"\nmetrics_dataset = \"d\"\nmetrics_table = \"t\"\nmetric_name = \"m\"\n",
        );
        let test = TestConfig::from_table("t", &table).unwrap();

        let settings = AnalysisSettings {
            min_runs_between_change_points: 4,
            num_runs_in_change_point_window: 20,
            ..AnalysisSettings::default()
        };
        assert_eq!(test.min_runs_between_change_points(&settings), 4);
        assert_eq!(test.num_runs_in_change_point_window(&settings), 20);
    }

    #[test]
    fn test_missing_keys_listed() {
        let table = parse_table("project = \"p\"\nmetric_name = \"m\"\n");

        match TestConfig::from_table("broken", &table) {
            Err(ConfigError::MissingKeys { test_id, missing }) => {
                assert_eq!(test_id, "broken");
                assert_eq!(missing, vec!["metrics_dataset", "metrics_table"]);
            }
            other => panic!("expected missing keys, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let table = parse_table(
            r#"
            project = "p"
            metrics_dataset = "d"
            metrics_table = "t"
            metric_name = "m"
            min_runs_between_change_points = "three"
            "#,
        );

        assert!(matches!(
            TestConfig::from_table("t", &table),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let table = parse_table(
            "project = \"p\"\nmetrics_dataset = \"d\"\nmetrics_table = \"t\"\nmetric_name = \"m\"\nnum_runs_in_change_point_window = 0\n",
        );

        assert!(matches!(
            TestConfig::from_table("t", &table),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
