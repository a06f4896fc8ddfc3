/// Error types for the performance analyzer
pub mod error;

/// Time-ordered benchmark measurements
pub mod series;

/// Change point detection and recency gating
pub mod detection;

/// Alert deduplication, issue reporting and alert metadata storage
pub mod alerts;

/// Configuration management
pub mod config;

/// Metric data sources
pub mod metrics;

/// Per-test analysis pipeline and batch driver
pub mod analysis;

// Re-export commonly used types
pub use analysis::{Analyzer, BatchSummary, NoChangeReason, Outcome};
pub use error::{AnalysisError, ConfigError, FetchError, IssueError, SeriesError, StoreError};
pub use series::MetricSeries;
