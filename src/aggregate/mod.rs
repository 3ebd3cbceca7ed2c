//! Order-independent result aggregation.
//!
//! One slot per queue ordinal, filled by completion events in whatever
//! order jobs finish. The final view is only reachable through
//! `finalize`, which consumes the aggregator after the pool is done, so a
//! report from a resumed run is ordinally identical to one from an
//! uninterrupted run.

use serde::Serialize;

use crate::domain::{Job, JobOutcome, JobStatus};

/// One job's row in the final report, in queue order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub ordinal: usize,
    pub regression_type: String,
    pub unit_name: String,
    pub chiplet: String,
    pub outcome: JobOutcome,
}

/// Aggregate tallies for exit-code determination by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_run: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped + self.not_run
    }

    /// No job ran and failed. NOT_RUN jobs are not failures.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Collects terminal outcomes keyed by queue ordinal.
#[derive(Debug)]
pub struct Aggregator {
    slots: Vec<(Job, Option<JobOutcome>)>,
}

impl Aggregator {
    /// One empty slot per job in the queue.
    pub fn new(jobs: &[Job]) -> Self {
        Self {
            slots: jobs.iter().map(|job| (job.clone(), None)).collect(),
        }
    }

    /// Record a terminal outcome. A job is terminal exactly once; a second
    /// outcome for the same ordinal is dropped with a warning.
    pub fn record(&mut self, ordinal: usize, outcome: JobOutcome) {
        match self.slots.get_mut(ordinal) {
            Some((_, slot @ None)) => *slot = Some(outcome),
            Some((job, Some(_))) => {
                tracing::warn!(ordinal, unit = %job.unit_name, "duplicate outcome ignored");
            }
            None => {
                tracing::warn!(ordinal, "outcome for unknown ordinal ignored");
            }
        }
    }

    /// Number of slots with a recorded outcome.
    pub fn recorded(&self) -> usize {
        self.slots.iter().filter(|(_, o)| o.is_some()).count()
    }

    /// Produce the final, ordinally ordered report. Jobs without a terminal
    /// outcome are reported as NOT_RUN, distinct from SKIPPED and FAILED.
    pub fn finalize(self, cancelled: bool, dispatched: usize) -> RunReport {
        let reason = if cancelled {
            "cancelled before dispatch"
        } else {
            "not executed (dry run)"
        };

        let mut counts = OutcomeCounts::default();
        let entries: Vec<ReportEntry> = self
            .slots
            .into_iter()
            .map(|(job, outcome)| {
                let outcome = outcome.unwrap_or_else(|| JobOutcome::not_run(reason));
                match outcome.status {
                    JobStatus::Succeeded => counts.succeeded += 1,
                    JobStatus::Failed => counts.failed += 1,
                    JobStatus::Skipped => counts.skipped += 1,
                    JobStatus::NotRun => counts.not_run += 1,
                }
                ReportEntry {
                    ordinal: job.ordinal,
                    regression_type: job.regression_type,
                    unit_name: job.unit_name,
                    chiplet: job.chiplet,
                    outcome,
                }
            })
            .collect();

        RunReport {
            entries,
            counts,
            cancelled,
            dispatched,
        }
    }
}

/// Read-only final view of a run, ordered by original queue ordinal.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub entries: Vec<ReportEntry>,
    pub counts: OutcomeCounts,
    pub cancelled: bool,
    /// Jobs handed to workers this run; resumed and NOT_RUN jobs excluded.
    pub dispatched: usize,
}
