//! Attempt records and exit classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How one execution attempt ended.
///
/// `Success`, `Nonzero`, and `Fatal` come from the external invoker;
/// `Timeout` is assigned by the supervisor when the attempt overran its
/// wall-clock limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitClass {
    /// Tool exited cleanly.
    Success,
    /// Tool exited nonzero without an explicit fatal marker. Retryable.
    Nonzero,
    /// Attempt overran the wall-clock limit and was killed. Retryable.
    Timeout,
    /// Explicit non-retryable condition (e.g. missing or unreadable workarea).
    Fatal,
}

impl ExitClass {
    /// Transient classifications are retried per policy; the rest terminate
    /// the job immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExitClass::Nonzero | ExitClass::Timeout)
    }
}

/// One execution try of a job, kept for diagnostics only.
///
/// Every attempt is logged; only the terminal outcome flows downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-based attempt number within the job.
    pub number: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub exit: ExitClass,
    /// Raw tool output, handed to the external parser on terminal attempts.
    pub raw_output: String,
}
