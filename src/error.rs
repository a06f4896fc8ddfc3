use thiserror::Error;

/// Errors that can occur when building a metric series
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Series length mismatch: {values} values but {timestamps} timestamps")]
    LengthMismatch { values: usize, timestamps: usize },

    #[error("Timestamps are not in ascending order at position {0}")]
    NotAscending(usize),
}

/// Errors that can occur while fetching metric data
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Metrics source not found: {0}")]
    SourceNotFound(String),

    #[error("Failed to parse metrics row: {0}")]
    ParseError(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur in the alert metadata store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The table has never been written. Callers treat this as "no prior alerts".
    #[error("Alert table not found: {0}")]
    TableNotFound(String),

    #[error("Failed to decode alert record: {0}")]
    DecodeError(String),

    #[error("Failed to encode alert record: {0}")]
    EncodeError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur when reporting to the issue tracker
#[derive(Error, Debug)]
pub enum IssueError {
    #[error("Issue tracker request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Missing credentials: environment variable {0} is not set")]
    MissingToken(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("Test {test_id} is missing required keys: {}", missing.join(", "))]
    MissingKeys {
        test_id: String,
        missing: Vec<String>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Errors that end the analysis of a single test entry
///
/// None of these abort a batch; the batch driver logs them and moves on.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid test configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to fetch metrics: {0}")]
    Fetch(#[from] FetchError),

    #[error("Alert store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Issue tracker failure: {0}")]
    Issue(#[from] IssueError),
}
