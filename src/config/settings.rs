//! Configuration file layout and global analysis settings
//!
//! ```toml
//! [settings]
//! num_runs_in_change_point_window = 14
//!
//! [tracker]
//! kind = "github"
//! owner = "apache"
//! repo = "beam"
//!
//! [storage]
//! metrics_dir = "metrics"
//! alerts_dir = "alerts"
//!
//! [tests.wordcount_py_batch]
//! project = "apache-beam-testing"
//! metrics_dataset = "beam_run_inference"
//! metrics_table = "torch_inference_imagenet_results_resnet101"
//! metric_name = "mean_load_model_latency_milli_secs"
//! ```

use crate::alerts::tracker::{DEFAULT_GITHUB_API_URL, DEFAULT_TOKEN_ENV};
use crate::alerts::{
    DEFAULT_ALERT_LABEL, DEFAULT_MAX_PRIOR_ALERTS, DEFAULT_MAX_RESULTS_TO_DISPLAY,
    DEFAULT_MIN_RUNS_BETWEEN_CHANGE_POINTS,
};
use crate::detection::energy::{
    DEFAULT_MIN_SEGMENT_SIZE, DEFAULT_PERMUTATIONS, DEFAULT_PVALUE, DEFAULT_SEED,
};
use crate::detection::{DEFAULT_MEDIAN_THRESHOLD, DEFAULT_NUM_RUNS_IN_CHANGE_POINT_WINDOW};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default number of most recent runs fetched for analysis
pub const DEFAULT_NUM_DATA_POINTS: usize = 100;

/// Global constants for one analysis pass
///
/// Every field can be overridden in the `[settings]` table. Per-test values for
/// run distance and window size take precedence over the defaults here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Relative median change a candidate must exceed
    pub median_threshold: f64,
    /// Significance level for the E-Divisive permutation test
    pub pvalue: f64,
    /// Shuffles per permutation test
    pub permutations: usize,
    /// Seed for the permutation RNG
    pub seed: u64,
    /// Smallest segment a split may leave on either side
    pub min_segment_size: usize,
    pub min_runs_between_change_points: usize,
    pub num_runs_in_change_point_window: usize,
    /// Most recent runs fetched per test
    pub num_data_points: usize,
    /// Runs shown on each side of the change point in the issue description
    pub max_results_to_display: usize,
    /// Earlier alerts consulted for deduplication
    pub max_prior_alerts: usize,
    /// Labels added to every issue
    pub default_labels: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            median_threshold: DEFAULT_MEDIAN_THRESHOLD,
            pvalue: DEFAULT_PVALUE,
            permutations: DEFAULT_PERMUTATIONS,
            seed: DEFAULT_SEED,
            min_segment_size: DEFAULT_MIN_SEGMENT_SIZE,
            min_runs_between_change_points: DEFAULT_MIN_RUNS_BETWEEN_CHANGE_POINTS,
            num_runs_in_change_point_window: DEFAULT_NUM_RUNS_IN_CHANGE_POINT_WINDOW,
            num_data_points: DEFAULT_NUM_DATA_POINTS,
            max_results_to_display: DEFAULT_MAX_RESULTS_TO_DISPLAY,
            max_prior_alerts: DEFAULT_MAX_PRIOR_ALERTS,
            default_labels: vec![DEFAULT_ALERT_LABEL.to_string()],
        }
    }
}

impl AnalysisSettings {
    /// Check that every setting is in its usable range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.median_threshold.is_finite() && self.median_threshold >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "median_threshold must be a non-negative number, got {}",
                self.median_threshold
            )));
        }

        if !(self.pvalue > 0.0 && self.pvalue < 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "pvalue must be between 0 and 1, got {}",
                self.pvalue
            )));
        }

        let positive = [
            ("permutations", self.permutations),
            ("min_segment_size", self.min_segment_size),
            (
                "num_runs_in_change_point_window",
                self.num_runs_in_change_point_window,
            ),
            ("num_data_points", self.num_data_points),
            ("max_prior_alerts", self.max_prior_alerts),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Issue tracker selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrackerConfig {
    /// File issues on GitHub
    #[serde(rename = "github")]
    GitHub {
        owner: String,
        repo: String,
        /// Environment variable holding the API token
        #[serde(default = "default_token_env")]
        token_env: String,
        #[serde(default = "default_api_url")]
        api_url: String,
    },
    /// Log issues instead of filing them
    #[default]
    Log,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_api_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

/// Locations of the file-backed metrics source and alert store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub metrics_dir: PathBuf,
    pub alerts_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            metrics_dir: PathBuf::from("metrics"),
            alerts_dir: PathBuf::from("alerts"),
        }
    }
}

/// Complete configuration file
///
/// Test entries stay as raw TOML tables until they are analysed, so a broken
/// entry only fails that test.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub settings: AnalysisSettings,
    pub tracker: TrackerConfig,
    pub storage: StorageConfig,
    pub tests: BTreeMap<String, toml::Table>,
}

impl Config {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` if it is not valid TOML for this layout, and
    /// `ConfigError::ValidationError` if a global setting is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        contents.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;

        if let TrackerConfig::GitHub { owner, repo, .. } = &self.tracker {
            if owner.is_empty() || repo.is_empty() {
                return Err(ConfigError::ValidationError(
                    "tracker owner and repo must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Keep only the named tests, warning about names that are not configured
    pub fn retain_tests(&mut self, test_ids: &[String]) {
        for test_id in test_ids {
            if !self.tests.contains_key(test_id) {
                log::warn!("Test '{}' is not in the configuration", test_id);
            }
        }
        self.tests.retain(|test_id, _| test_ids.contains(test_id));
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(contents: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }
}
