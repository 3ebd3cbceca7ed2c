//! Boundary traits for the external analysis tool and its output parser.
//!
//! The core treats the analysis call as an opaque awaitable operation and
//! stores the parser's result verbatim. `CommandInvoker` is the production
//! implementation shelling out to the configured tool; `MockInvoker` is the
//! scripted test double.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::{AnalysisResult, ExitClass, ResultStatus};

/// What one analysis attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub exit: ExitClass,
    pub raw_output: String,
}

impl Invocation {
    pub fn new(exit: ExitClass, raw_output: impl Into<String>) -> Self {
        Self {
            exit,
            raw_output: raw_output.into(),
        }
    }
}

/// Executes one analysis attempt for a job.
///
/// Implementations must terminate the underlying process tree when the
/// returned future is dropped; the supervisor drops it on timeout.
#[async_trait]
pub trait AnalysisInvoker: Send + Sync {
    async fn invoke(&self, workarea: &Path, regression_type: &str) -> Invocation;
}

/// Turns raw tool output into the structured result the core stores
/// verbatim.
pub trait OutputParser: Send + Sync {
    fn parse(&self, raw_output: &str) -> AnalysisResult;
}

/// Invoker that runs the configured analysis command as
/// `<command> <workarea> <regression_type>`.
pub struct CommandInvoker {
    command: String,
    /// Output substring that marks a failure as non-retryable.
    fatal_marker: Option<String>,
}

impl CommandInvoker {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            fatal_marker: None,
        }
    }

    /// Treat any attempt whose output contains `marker` as fatal.
    pub fn with_fatal_marker(mut self, marker: impl Into<String>) -> Self {
        self.fatal_marker = Some(marker.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl AnalysisInvoker for CommandInvoker {
    async fn invoke(&self, workarea: &Path, regression_type: &str) -> Invocation {
        // A missing or unreadable workarea can never succeed on retry.
        if !workarea.is_dir() {
            return Invocation::new(
                ExitClass::Fatal,
                format!("workarea not found: {}", workarea.display()),
            );
        }

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("{} \"$1\" \"$2\"", self.command))
            .arg("regrun")
            .arg(workarea)
            .arg(regression_type);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => {
                return Invocation::new(ExitClass::Fatal, format!("failed to spawn tool: {e}"));
            }
        };

        let mut raw = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            raw.push_str(&stderr);
        }

        let exit = if output.status.success() {
            ExitClass::Success
        } else if self
            .fatal_marker
            .as_deref()
            .is_some_and(|marker| raw.contains(marker))
        {
            ExitClass::Fatal
        } else {
            ExitClass::Nonzero
        };

        Invocation::new(exit, raw)
    }
}

/// Parser for tools that report `status|details|runtime` on the last
/// non-empty output line.
#[derive(Debug, Clone, Default)]
pub struct PipeParser;

impl OutputParser for PipeParser {
    fn parse(&self, raw_output: &str) -> AnalysisResult {
        let line = raw_output
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("");
        let mut fields = line.splitn(3, '|');
        let status = fields.next().and_then(ResultStatus::parse);
        match status {
            Some(status) => AnalysisResult::new(
                status,
                fields.next().unwrap_or("").to_string(),
                fields.next().unwrap_or("").to_string(),
            ),
            None => AnalysisResult::new(
                ResultStatus::NotFound,
                format!("unparseable tool output: {line:?}"),
                String::new(),
            ),
        }
    }
}

/// Scripted invoker for tests.
///
/// Each unit can be given a queue of exit classifications consumed one per
/// attempt; units without a script (or with an exhausted one) succeed.
/// Tracks peak concurrency so tests can assert the pool's ceiling.
pub struct MockInvoker {
    scripts: Mutex<HashMap<String, VecDeque<ExitClass>>>,
    delay: Duration,
    hang: bool,
    output: String,
    invocations: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockInvoker {
    /// An invoker where every attempt succeeds immediately.
    pub fn succeeding() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            hang: false,
            output: "PASSED|clean|1s".to_string(),
            invocations: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// An invoker whose attempts never return (for timeout tests).
    pub fn hanging() -> Self {
        let mut invoker = Self::succeeding();
        invoker.hang = true;
        invoker
    }

    /// Sleep this long inside every attempt.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Raw output returned by every attempt.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Script the exit classifications for one unit's successive attempts.
    pub fn script_unit(self, unit: &str, exits: Vec<ExitClass>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(unit.to_string(), exits.into());
        self
    }

    /// Total attempts issued so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Highest number of attempts observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_exit(&self, workarea: &Path) -> ExitClass {
        // Scripts are keyed by unit name, which is the workarea's file stem
        // in tests.
        let unit = workarea
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut scripts = self.scripts.lock().unwrap();
        scripts
            .get_mut(&unit)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(ExitClass::Success)
    }
}

#[async_trait]
impl AnalysisInvoker for MockInvoker {
    async fn invoke(&self, workarea: &Path, _regression_type: &str) -> Invocation {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if self.hang {
            // Held until the supervisor's timeout drops this future.
            tokio::time::sleep(Duration::from_secs(3600)).await;
        } else if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        Invocation::new(self.next_exit(workarea), self.output.clone())
    }
}
