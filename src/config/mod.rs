/// Configuration management
pub mod settings;
pub mod test_config;

pub use settings::{AnalysisSettings, Config, StorageConfig, TrackerConfig, DEFAULT_NUM_DATA_POINTS};
pub use test_config::{TestConfig, REQUIRED_TEST_KEYS};
