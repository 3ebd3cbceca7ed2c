//! Error types for regrun
//!
//! Centralized error handling using thiserror. Only configuration problems
//! abort a run before it starts; per-job failures travel as `JobOutcome`
//! values and never cross job boundaries as errors.

use thiserror::Error;

/// All error types that can occur in regrun
#[derive(Debug, Error)]
pub enum RegrunError {
    /// Bad filters, invalid parallelism, or other pre-run configuration problems
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error (config and catalog files)
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for regrun operations
pub type Result<T> = std::result::Result<T, RegrunError>;
