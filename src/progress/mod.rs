//! Progress accounting and ETA estimation.
//!
//! One tracker per run, shared across workers. All counters live behind a
//! single mutex so two simultaneous completions can never lose an update.
//! Emission cadence is the caller's concern; this module only exposes
//! snapshots.

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Derived, ephemeral view of a run's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Jobs with a terminal outcome, resumed skips included.
    pub completed: usize,
    pub total: usize,
    /// `completed / total` as a percentage; an empty run reads as complete.
    pub percent: f64,
    /// Wall-clock time since the tracker was started.
    pub elapsed: Duration,
    /// Unit names currently executing, sorted.
    pub in_flight: Vec<String>,
    /// `None` until at least one job has actually executed.
    pub eta: Option<Duration>,
}

#[derive(Debug, Default)]
struct ProgressState {
    total: usize,
    parallelism: usize,
    /// Terminal jobs, including resumed skips.
    finished: usize,
    /// Terminal jobs that actually executed; only these feed the average.
    executed: usize,
    cumulative: Duration,
    in_flight: BTreeSet<String>,
}

/// Thread-safe progress tracker for one run.
#[derive(Debug)]
pub struct ProgressTracker {
    started: Instant,
    state: Mutex<ProgressState>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    /// Set the totals once the queue is known.
    pub fn begin(&self, total: usize, parallelism: usize) {
        let mut state = self.state.lock().unwrap();
        state.total = total;
        state.parallelism = parallelism.max(1);
    }

    pub fn job_started(&self, unit_name: &str) {
        let mut state = self.state.lock().unwrap();
        state.in_flight.insert(unit_name.to_string());
    }

    /// Record a terminal outcome for an executed job.
    pub fn job_finished(&self, unit_name: &str, elapsed: Duration) {
        let mut state = self.state.lock().unwrap();
        state.in_flight.remove(unit_name);
        state.finished += 1;
        state.executed += 1;
        state.cumulative += elapsed;
    }

    /// Record a job folded in from the resume log. Counts toward totals but
    /// not toward the per-job average.
    pub fn job_skipped(&self) {
        let mut state = self.state.lock().unwrap();
        state.finished += 1;
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock().unwrap();
        let remaining = state.total.saturating_sub(state.finished);
        let eta = if remaining == 0 {
            Some(Duration::ZERO)
        } else if state.executed == 0 {
            None
        } else {
            // Remaining jobs run `parallelism` at a time.
            let average = state.cumulative / state.executed as u32;
            Some(average.mul_f64(remaining as f64 / state.parallelism as f64))
        };
        let percent = if state.total == 0 {
            100.0
        } else {
            state.finished as f64 * 100.0 / state.total as f64
        };
        ProgressSnapshot {
            completed: state.finished,
            total: state.total,
            percent,
            elapsed: self.started.elapsed(),
            in_flight: state.in_flight.iter().cloned().collect(),
            eta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_run_reads_complete() {
        let tracker = ProgressTracker::new();
        tracker.begin(0, 4);
        let snap = tracker.snapshot();
        assert_eq!(snap.percent, 100.0);
        assert_eq!(snap.eta, Some(Duration::ZERO));
    }

    #[test]
    fn test_no_eta_before_first_execution() {
        let tracker = ProgressTracker::new();
        tracker.begin(10, 2);
        assert_eq!(tracker.snapshot().eta, None);

        // resumed skips don't produce an average either
        tracker.job_skipped();
        assert_eq!(tracker.snapshot().eta, None);
    }

    #[test]
    fn test_eta_formula() {
        let tracker = ProgressTracker::new();
        tracker.begin(10, 2);
        // four jobs finished, 10s each: average 10s, 6 remaining, C = 2
        for i in 0..4 {
            let unit = format!("u{i}");
            tracker.job_started(&unit);
            tracker.job_finished(&unit, Duration::from_secs(10));
        }
        let snap = tracker.snapshot();
        assert_eq!(snap.completed, 4);
        assert_eq!(snap.percent, 40.0);
        assert_eq!(snap.eta, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_skipped_jobs_count_toward_percent_not_average() {
        let tracker = ProgressTracker::new();
        tracker.begin(4, 1);
        tracker.job_skipped();
        tracker.job_skipped();
        tracker.job_started("alu0");
        tracker.job_finished("alu0", Duration::from_secs(8));
        let snap = tracker.snapshot();
        assert_eq!(snap.completed, 3);
        assert_eq!(snap.percent, 75.0);
        // average is 8s from the single executed job, 1 remaining, C = 1
        assert_eq!(snap.eta, Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_in_flight_names_sorted() {
        let tracker = ProgressTracker::new();
        tracker.begin(3, 3);
        tracker.job_started("zeta");
        tracker.job_started("alpha");
        tracker.job_started("mid");
        assert_eq!(tracker.snapshot().in_flight, vec!["alpha", "mid", "zeta"]);
        tracker.job_finished("mid", Duration::from_secs(1));
        assert_eq!(tracker.snapshot().in_flight, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_eta_zero_when_done() {
        let tracker = ProgressTracker::new();
        tracker.begin(1, 2);
        tracker.job_started("alu0");
        tracker.job_finished("alu0", Duration::from_secs(5));
        let snap = tracker.snapshot();
        assert_eq!(snap.percent, 100.0);
        assert_eq!(snap.eta, Some(Duration::ZERO));
    }

    #[test]
    fn test_concurrent_updates_not_lost() {
        use std::sync::Arc;
        let tracker = Arc::new(ProgressTracker::new());
        tracker.begin(64, 8);
        let mut handles = Vec::new();
        for t in 0..8 {
            let tracker = tracker.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..8 {
                    let unit = format!("u{t}-{i}");
                    tracker.job_started(&unit);
                    tracker.job_finished(&unit, Duration::from_millis(10));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let snap = tracker.snapshot();
        assert_eq!(snap.completed, 64);
        assert!(snap.in_flight.is_empty());
    }
}
