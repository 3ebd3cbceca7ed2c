//! Terminal job outcomes and the opaque analysis result payload.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Terminal status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// Ran and the analysis call succeeded.
    Succeeded,
    /// Ran and failed (exhausted retries or hit a fatal condition).
    Failed,
    /// Found terminal in a prior run's resume log; never re-executed.
    Skipped,
    /// Never executed in this run (cancellation or dry-run).
    NotRun,
}

impl JobStatus {
    /// Wire representation used in the resume log and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Skipped => "SKIPPED",
            JobStatus::NotRun => "NOT_RUN",
        }
    }

    /// Parse the wire representation. Returns `None` for unknown strings.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCEEDED" => Some(JobStatus::Succeeded),
            "FAILED" => Some(JobStatus::Failed),
            "SKIPPED" => Some(JobStatus::Skipped),
            "NOT_RUN" => Some(JobStatus::NotRun),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status field of the external parser's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Passed,
    Warn,
    Failed,
    NotFound,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Passed => "PASSED",
            ResultStatus::Warn => "WARN",
            ResultStatus::Failed => "FAILED",
            ResultStatus::NotFound => "NOT_FOUND",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PASSED" => Some(ResultStatus::Passed),
            "WARN" => Some(ResultStatus::Warn),
            "FAILED" => Some(ResultStatus::Failed),
            "NOT_FOUND" => Some(ResultStatus::NotFound),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result produced by the external output parser.
///
/// Stored verbatim; this crate never interprets the details or runtime
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: ResultStatus,
    pub details: String,
    pub runtime: String,
}

impl AnalysisResult {
    pub fn new(status: ResultStatus, details: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            status,
            details: details.into(),
            runtime: runtime.into(),
        }
    }

    /// Placeholder for jobs folded in from a resume log, where the original
    /// parser detail is no longer available.
    pub fn previously_completed(recorded: JobStatus) -> Self {
        Self::new(
            ResultStatus::NotFound,
            format!("previously completed as {}, detail unavailable", recorded),
            String::new(),
        )
    }

    /// Placeholder for jobs that never executed in this run.
    pub fn not_executed(reason: impl Into<String>) -> Self {
        Self::new(ResultStatus::NotFound, reason, String::new())
    }
}

/// The terminal, recorded result of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub status: JobStatus,
    /// Attempts consumed (0 for SKIPPED and NOT_RUN).
    pub attempts: u32,
    /// Total elapsed across all attempts, including retry delays.
    pub elapsed: Duration,
    pub result: AnalysisResult,
}

impl JobOutcome {
    pub fn succeeded(attempts: u32, elapsed: Duration, result: AnalysisResult) -> Self {
        Self {
            status: JobStatus::Succeeded,
            attempts,
            elapsed,
            result,
        }
    }

    pub fn failed(attempts: u32, elapsed: Duration, result: AnalysisResult) -> Self {
        Self {
            status: JobStatus::Failed,
            attempts,
            elapsed,
            result,
        }
    }

    pub fn skipped(result: AnalysisResult) -> Self {
        Self {
            status: JobStatus::Skipped,
            attempts: 0,
            elapsed: Duration::ZERO,
            result,
        }
    }

    pub fn not_run(reason: impl Into<String>) -> Self {
        Self {
            status: JobStatus::NotRun,
            attempts: 0,
            elapsed: Duration::ZERO,
            result: AnalysisResult::not_executed(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_wire_roundtrip() {
        for status in [
            JobStatus::Succeeded,
            JobStatus::Failed,
            JobStatus::Skipped,
            JobStatus::NotRun,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("RUNNING"), None);
        assert_eq!(JobStatus::parse(""), None);
    }

    #[test]
    fn test_result_status_wire_roundtrip() {
        for status in [
            ResultStatus::Passed,
            ResultStatus::Warn,
            ResultStatus::Failed,
            ResultStatus::NotFound,
        ] {
            assert_eq!(ResultStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ResultStatus::parse("passed"), None);
    }

    #[test]
    fn test_skipped_outcome_placeholder() {
        let outcome = JobOutcome::skipped(AnalysisResult::previously_completed(JobStatus::Succeeded));
        assert_eq!(outcome.status, JobStatus::Skipped);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert_eq!(outcome.result.status, ResultStatus::NotFound);
        assert!(outcome.result.details.contains("previously completed as SUCCEEDED"));
    }

    #[test]
    fn test_not_run_outcome() {
        let outcome = JobOutcome::not_run("cancelled before dispatch");
        assert_eq!(outcome.status, JobStatus::NotRun);
        assert_eq!(outcome.result.details, "cancelled before dispatch");
    }

    #[test]
    fn test_succeeded_outcome_keeps_result_verbatim() {
        let result = AnalysisResult::new(ResultStatus::Warn, "3 warnings", "42s");
        let outcome = JobOutcome::succeeded(1, Duration::from_secs(42), result.clone());
        assert_eq!(outcome.status, JobStatus::Succeeded);
        assert_eq!(outcome.result, result);
    }
}
