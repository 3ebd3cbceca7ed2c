//! Bounded-concurrency worker pool.
//!
//! The pool is the single owner of dispatch order: it keeps up to C jobs in
//! flight and refills a slot the moment any in-flight job reaches a
//! terminal outcome, preserving queue order among the not-yet-dispatched.
//! Workers report back over an mpsc channel; the event loop fans each
//! completion out to the resume writer, the progress tracker, and the
//! aggregator, so the log has exactly one logical writer and the
//! aggregation map is never touched by workers directly.
//!
//! Cancellation is a watch-channel flag: no new dispatch, in-flight jobs
//! run to their own terminal outcome or timeout, everything received so
//! far is flushed, and the pool returns a partial result instead of
//! raising.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::aggregate::Aggregator;
use crate::domain::{Job, JobOutcome};
use crate::invoker::{AnalysisInvoker, OutputParser};
use crate::progress::ProgressTracker;
use crate::resume::ResumeWriter;
use crate::supervisor::{RetryPolicy, supervise};

/// Completion event sent from a worker task back to the event loop.
#[derive(Debug)]
struct CompletionEvent {
    ordinal: usize,
    regression_type: String,
    unit_name: String,
    outcome: JobOutcome,
}

/// What the pool did, for the run driver's summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRun {
    /// Jobs handed to a worker.
    pub dispatched: usize,
    /// Jobs that reached a terminal outcome.
    pub completed: usize,
    pub cancelled: bool,
}

/// Bounded-concurrency dispatcher executing jobs through the supervisor.
pub struct WorkerPool {
    invoker: Arc<dyn AnalysisInvoker>,
    parser: Arc<dyn OutputParser>,
    parallelism: usize,
    policy: RetryPolicy,
}

impl WorkerPool {
    pub fn new(
        invoker: Arc<dyn AnalysisInvoker>,
        parser: Arc<dyn OutputParser>,
        parallelism: usize,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            invoker,
            parser,
            parallelism: parallelism.max(1),
            policy,
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Execute all jobs, fanning completion events out to the writer,
    /// tracker, and aggregator. Returns when every job is terminal or, on
    /// cancellation, when the in-flight jobs have drained.
    pub async fn run(
        &self,
        jobs: &[Job],
        aggregator: &mut Aggregator,
        progress: &ProgressTracker,
        mut writer: Option<&mut ResumeWriter>,
        mut cancel: watch::Receiver<bool>,
    ) -> PoolRun {
        let (event_tx, mut event_rx) = mpsc::channel::<CompletionEvent>(self.parallelism);
        let mut in_flight: HashMap<usize, JoinHandle<()>> = HashMap::new();
        let mut next = 0usize;
        let mut dispatched = 0usize;
        let mut completed = 0usize;
        let mut cancelled = *cancel.borrow();
        let mut cancel_open = true;

        while !cancelled && in_flight.len() < self.parallelism && next < jobs.len() {
            self.dispatch(&jobs[next], &event_tx, &mut in_flight, progress);
            next += 1;
            dispatched += 1;
        }

        loop {
            if in_flight.is_empty() && (cancelled || next >= jobs.len()) {
                break;
            }

            tokio::select! {
                changed = cancel.changed(), if cancel_open && !cancelled => {
                    match changed {
                        Ok(()) => {
                            if *cancel.borrow() {
                                cancelled = true;
                                tracing::warn!(
                                    in_flight = in_flight.len(),
                                    pending = jobs.len() - next,
                                    "cancellation received, draining in-flight jobs"
                                );
                            }
                        }
                        // Sender dropped: no cancellation can arrive anymore.
                        Err(_) => cancel_open = false,
                    }
                }
                event = event_rx.recv() => {
                    // The loop holds a sender, so recv cannot yield None
                    // while jobs are in flight.
                    let Some(event) = event else { break };
                    if let Some(handle) = in_flight.remove(&event.ordinal) {
                        // Worker has already sent its event; reap the task
                        // to surface panics.
                        if let Err(e) = handle.await {
                            tracing::error!(ordinal = event.ordinal, error = ?e, "worker task panicked");
                        }
                    }
                    completed += 1;
                    progress.job_finished(&event.unit_name, event.outcome.elapsed);
                    if let Some(w) = writer.as_deref_mut()
                        && let Err(e) = w.append(
                            &event.regression_type,
                            event.ordinal,
                            &event.unit_name,
                            event.outcome.status,
                        )
                    {
                        // The run continues without a resume guarantee for
                        // this job; siblings are unaffected.
                        tracing::warn!(
                            unit = %event.unit_name,
                            error = %e,
                            "failed to append resume record"
                        );
                    }
                    aggregator.record(event.ordinal, event.outcome);

                    if !cancelled {
                        while in_flight.len() < self.parallelism && next < jobs.len() {
                            self.dispatch(&jobs[next], &event_tx, &mut in_flight, progress);
                            next += 1;
                            dispatched += 1;
                        }
                    }
                }
            }
        }

        tracing::info!(dispatched, completed, cancelled, "worker pool drained");
        PoolRun {
            dispatched,
            completed,
            cancelled,
        }
    }

    fn dispatch(
        &self,
        job: &Job,
        event_tx: &mpsc::Sender<CompletionEvent>,
        in_flight: &mut HashMap<usize, JoinHandle<()>>,
        progress: &ProgressTracker,
    ) {
        tracing::info!(
            unit = %job.unit_name,
            regression = %job.regression_type,
            ordinal = job.ordinal,
            "dispatching job"
        );
        progress.job_started(&job.unit_name);

        let invoker = self.invoker.clone();
        let parser = self.parser.clone();
        let policy = self.policy.clone();
        let event_tx = event_tx.clone();
        let job = job.clone();
        let ordinal = job.ordinal;

        let handle = tokio::spawn(async move {
            let outcome = supervise(&job, invoker.as_ref(), parser.as_ref(), &policy).await;
            let event = CompletionEvent {
                ordinal: job.ordinal,
                regression_type: job.regression_type,
                unit_name: job.unit_name,
                outcome,
            };
            let _ = event_tx.send(event).await;
        });
        in_flight.insert(ordinal, handle);
    }
}
