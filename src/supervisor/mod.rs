//! Retry and timeout supervision for a single job.
//!
//! Wraps each attempt in a hard wall-clock timeout and applies the bounded
//! retry policy: success and fatal classifications terminate the job
//! immediately, transient ones (nonzero exit, timeout) are retried until
//! `1 + max_retries` attempts are used. Policy is separated from mechanism:
//! what counts as fatal is decided by the invoker, the supervisor only
//! applies the classification.

use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::domain::{AnalysisResult, Attempt, ExitClass, Job, JobOutcome, ResultStatus};
use crate::invoker::{AnalysisInvoker, OutputParser};

/// Retry and timeout parameters for one run.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt, so a job uses at most
    /// `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Pause between a transient failure and the next attempt.
    pub retry_delay: Duration,
    /// Hard wall-clock limit per attempt, not per job.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Drive one job to its terminal outcome.
///
/// Never returns an error: every failure mode is folded into the returned
/// `JobOutcome`, so one job's trouble cannot abort its siblings.
pub async fn supervise(
    job: &Job,
    invoker: &dyn AnalysisInvoker,
    parser: &dyn OutputParser,
    policy: &RetryPolicy,
) -> JobOutcome {
    let started = Instant::now();
    let mut attempt_no = 0u32;

    loop {
        attempt_no += 1;
        let attempt = run_attempt(job, invoker, policy.timeout, attempt_no).await;
        tracing::info!(
            unit = %job.unit_name,
            regression = %job.regression_type,
            attempt = attempt.number,
            exit = ?attempt.exit,
            "attempt finished"
        );

        match attempt.exit {
            ExitClass::Success => {
                let result = parser.parse(&attempt.raw_output);
                return JobOutcome::succeeded(attempt_no, started.elapsed(), result);
            }
            ExitClass::Fatal => {
                tracing::error!(
                    unit = %job.unit_name,
                    regression = %job.regression_type,
                    "fatal failure, not retrying"
                );
                let result = parser.parse(&attempt.raw_output);
                return JobOutcome::failed(attempt_no, started.elapsed(), result);
            }
            ExitClass::Nonzero | ExitClass::Timeout => {
                if attempt_no >= policy.max_attempts() {
                    let result = terminal_transient_result(&attempt, parser, policy);
                    return JobOutcome::failed(attempt_no, started.elapsed(), result);
                }
                tracing::warn!(
                    unit = %job.unit_name,
                    regression = %job.regression_type,
                    attempt = attempt_no,
                    remaining = policy.max_attempts() - attempt_no,
                    "transient failure, retrying"
                );
                if !policy.retry_delay.is_zero() {
                    tokio::time::sleep(policy.retry_delay).await;
                }
            }
        }
    }
}

/// Execute one attempt under the wall-clock limit. On timeout the invoker's
/// future is dropped, which terminates the underlying process tree.
async fn run_attempt(
    job: &Job,
    invoker: &dyn AnalysisInvoker,
    timeout: Duration,
    number: u32,
) -> Attempt {
    let started_at = Utc::now();
    let (exit, raw_output) =
        match tokio::time::timeout(timeout, invoker.invoke(&job.workarea, &job.regression_type))
            .await
        {
            Ok(invocation) => (invocation.exit, invocation.raw_output),
            Err(_) => {
                tracing::warn!(
                    unit = %job.unit_name,
                    regression = %job.regression_type,
                    timeout_secs = timeout.as_secs(),
                    "attempt timed out, killing execution"
                );
                (ExitClass::Timeout, String::new())
            }
        };
    Attempt {
        number,
        started_at,
        finished_at: Utc::now(),
        exit,
        raw_output,
    }
}

/// Result payload for a job whose retries are exhausted. A timed-out final
/// attempt produced no output to parse.
fn terminal_transient_result(
    attempt: &Attempt,
    parser: &dyn OutputParser,
    policy: &RetryPolicy,
) -> AnalysisResult {
    match attempt.exit {
        ExitClass::Timeout => AnalysisResult::new(
            ResultStatus::Failed,
            format!("timed out after {}s", policy.timeout.as_secs()),
            String::new(),
        ),
        _ => parser.parse(&attempt.raw_output),
    }
}
