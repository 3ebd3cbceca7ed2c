//! Top-level run driver.
//!
//! Ties the pieces together for one regression run: build the queue, fold
//! in prior outcomes from the resume log, hand the remainder to the worker
//! pool, and finalize the ordinally ordered report.

use std::sync::Arc;

use tokio::sync::watch;

use crate::aggregate::{Aggregator, RunReport};
use crate::catalog::UnitCatalog;
use crate::config::Config;
use crate::domain::{AnalysisResult, JobOutcome};
use crate::error::Result;
use crate::invoker::{AnalysisInvoker, OutputParser};
use crate::pool::WorkerPool;
use crate::progress::ProgressTracker;
use crate::queue;
use crate::resume::{ResumeState, ResumeWriter};

/// One configured regression run.
pub struct RegressionRun {
    config: Config,
    invoker: Arc<dyn AnalysisInvoker>,
    parser: Arc<dyn OutputParser>,
}

impl RegressionRun {
    /// Validates the configuration; the only hard failure surface before
    /// execution starts.
    pub fn new(
        config: Config,
        invoker: Arc<dyn AnalysisInvoker>,
        parser: Arc<dyn OutputParser>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            invoker,
            parser,
        })
    }

    /// Execute the run to completion or cancellation.
    ///
    /// The caller owns the progress tracker and may sample snapshots from
    /// other tasks at whatever cadence it likes.
    pub async fn execute(
        &self,
        catalog: &UnitCatalog,
        progress: &ProgressTracker,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunReport> {
        let jobs = queue::build_queue(catalog, &self.config.filters)?;
        let parallelism = self.config.execution.parallelism.resolve();
        progress.begin(jobs.len(), parallelism);
        tracing::info!(
            jobs = jobs.len(),
            parallelism,
            dry_run = self.config.execution.dry_run,
            "starting regression run"
        );

        let prior = match &self.config.resume.log_path {
            Some(path) if self.config.resume.load_prior => ResumeState::load(path),
            _ => ResumeState::default(),
        };

        let mut aggregator = Aggregator::new(&jobs);
        let mut runnable = Vec::new();
        let mut skipped = 0usize;
        for job in &jobs {
            match prior.get(&job.id()) {
                Some(record) => {
                    aggregator.record(
                        job.ordinal,
                        JobOutcome::skipped(AnalysisResult::previously_completed(record.status)),
                    );
                    progress.job_skipped();
                    skipped += 1;
                }
                None => runnable.push(job.clone()),
            }
        }
        if skipped > 0 {
            tracing::info!(skipped, remaining = runnable.len(), "resumed prior outcomes");
        }

        if self.config.execution.dry_run {
            return Ok(aggregator.finalize(false, 0));
        }

        let mut writer = match &self.config.resume.log_path {
            Some(path) => Some(ResumeWriter::open(path)?),
            None => None,
        };

        let pool = WorkerPool::new(
            self.invoker.clone(),
            self.parser.clone(),
            parallelism,
            self.config.retry_policy(),
        );
        let run = pool
            .run(&runnable, &mut aggregator, progress, writer.as_mut(), cancel)
            .await;

        let report = aggregator.finalize(run.cancelled, run.dispatched);
        tracing::info!(
            succeeded = report.counts.succeeded,
            failed = report.counts.failed,
            skipped = report.counts.skipped,
            not_run = report.counts.not_run,
            cancelled = report.cancelled,
            "regression run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::catalog::{RunFilter, UnitEntry};
    use crate::config::Parallelism;
    use crate::domain::JobStatus;
    use crate::error::RegrunError;
    use crate::invoker::{MockInvoker, PipeParser};

    fn catalog(n: usize) -> UnitCatalog {
        UnitCatalog::new(
            (0..n)
                .map(|i| UnitEntry {
                    unit_name: format!("u{i}"),
                    chiplet: "core".to_string(),
                    workarea: PathBuf::from(format!("/work/u{i}")),
                })
                .collect(),
        )
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.execution.parallelism = Parallelism::Count(2);
        config.execution.retry_delay_seconds = 0;
        config.filters = RunFilter {
            chiplets: vec![],
            units: vec![],
            regression_types: vec!["nightly".to_string()],
        };
        config
    }

    fn run_with(config: Config) -> RegressionRun {
        RegressionRun::new(config, Arc::new(MockInvoker::succeeding()), Arc::new(PipeParser))
            .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let mut bad = config();
        bad.execution.timeout_seconds = 0;
        let result = RegressionRun::new(bad, Arc::new(MockInvoker::succeeding()), Arc::new(PipeParser));
        assert!(matches!(result, Err(RegrunError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_plain_run_all_succeed() {
        let run = run_with(config());
        let progress = ProgressTracker::new();
        let (_tx, cancel) = watch::channel(false);
        let report = run.execute(&catalog(4), &progress, cancel).await.unwrap();
        assert_eq!(report.counts.succeeded, 4);
        assert_eq!(report.dispatched, 4);
        assert_eq!(progress.snapshot().completed, 4);
    }

    #[tokio::test]
    async fn test_unknown_filter_surfaces_configuration_error() {
        let mut cfg = config();
        cfg.filters.chiplets = vec!["io".to_string()];
        let run = run_with(cfg);
        let progress = ProgressTracker::new();
        let (_tx, cancel) = watch::channel(false);
        let err = run.execute(&catalog(2), &progress, cancel).await.unwrap_err();
        assert!(matches!(err, RegrunError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_dry_run_reports_not_run() {
        let mut cfg = config();
        cfg.execution.dry_run = true;
        let run = run_with(cfg);
        let progress = ProgressTracker::new();
        let (_tx, cancel) = watch::channel(false);
        let report = run.execute(&catalog(3), &progress, cancel).await.unwrap();
        assert_eq!(report.counts.not_run, 3);
        assert_eq!(report.dispatched, 0);
        assert!(report.entries.iter().all(|e| e.outcome.status == JobStatus::NotRun));
    }

    #[tokio::test]
    async fn test_empty_queue_is_not_an_error() {
        let mut cfg = config();
        cfg.filters.regression_types.clear();
        let run = run_with(cfg);
        let progress = ProgressTracker::new();
        let (_tx, cancel) = watch::channel(false);
        let report = run.execute(&catalog(3), &progress, cancel).await.unwrap();
        assert!(report.entries.is_empty());
    }
}
