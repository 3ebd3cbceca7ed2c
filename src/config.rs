//! Run configuration.
//!
//! Sectioned serde config with per-section defaults, loadable from YAML.
//! Validation happens up front: a bad value is a configuration error
//! before any job runs, never a mid-run surprise.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::RunFilter;
use crate::error::{RegrunError, Result};
use crate::supervisor::RetryPolicy;

/// Concurrency ceiling: an explicit count or `auto`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parallelism {
    Count(u32),
    /// Only the keyword `auto` is accepted; kept as written for error
    /// messages.
    Keyword(String),
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::Keyword("auto".to_string())
    }
}

impl Parallelism {
    pub fn validate(&self) -> Result<()> {
        match self {
            Parallelism::Count(0) => Err(RegrunError::Configuration(
                "parallelism must be at least 1".to_string(),
            )),
            Parallelism::Count(_) => Ok(()),
            Parallelism::Keyword(word) if word == "auto" => Ok(()),
            Parallelism::Keyword(word) => Err(RegrunError::Configuration(format!(
                "invalid parallelism {word:?} (expected a positive integer or \"auto\")"
            ))),
        }
    }

    /// Resolve to a concrete ceiling. `auto` uses the host's available
    /// parallelism, falling back to 4 when detection is unavailable.
    pub fn resolve(&self) -> usize {
        match self {
            Parallelism::Count(n) => (*n).max(1) as usize,
            Parallelism::Keyword(_) => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub parallelism: Parallelism,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    /// Build the queue and report everything as NOT_RUN without executing.
    pub dry_run: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallelism: Parallelism::default(),
            timeout_seconds: 30 * 60,
            max_retries: 2,
            retry_delay_seconds: 5,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeFileConfig {
    /// Where terminal outcomes are appended; `None` disables persistence.
    pub log_path: Option<PathBuf>,
    /// When false, a prior log is ignored on startup (outcomes are still
    /// appended for the next run).
    pub load_prior: bool,
}

impl Default for ResumeFileConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            load_prior: true,
        }
    }
}

/// Binary-level glue describing how to launch the external analysis tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Invoked as `<command> <workarea> <regression_type>`.
    pub command: String,
    /// Output substring marking a failure as non-retryable.
    pub fatal_marker: Option<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command: "run_regression".to_string(),
            fatal_marker: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub execution: ExecutionConfig,
    pub resume: ResumeFileConfig,
    pub filters: RunFilter,
    pub tool: ToolConfig,
}

impl Config {
    /// Load and validate a config from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.execution.parallelism.validate()?;
        if self.execution.timeout_seconds == 0 {
            return Err(RegrunError::Configuration(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.tool.command.trim().is_empty() {
            return Err(RegrunError::Configuration(
                "tool command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.execution.max_retries,
            retry_delay: Duration::from_secs(self.execution.retry_delay_seconds),
            timeout: Duration::from_secs(self.execution.timeout_seconds),
        }
    }
}
