use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use tokio::sync::watch;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use regrun::aggregate::RunReport;
use regrun::catalog::UnitCatalog;
use regrun::config::Config;
use regrun::domain::JobStatus;
use regrun::invoker::{CommandInvoker, PipeParser};
use regrun::progress::ProgressTracker;
use regrun::resume::ResumeState;
use regrun::runner::RegressionRun;

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("regrun")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("regrun.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn handle_run_command(
    config_path: &PathBuf,
    catalog_path: &PathBuf,
    resume_log: Option<PathBuf>,
    dry_run: bool,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let mut config = Config::from_file(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(path) = resume_log {
        config.resume.log_path = Some(path);
    }
    if dry_run {
        config.execution.dry_run = true;
    }

    let catalog = UnitCatalog::from_file(catalog_path)
        .with_context(|| format!("Failed to load catalog from {}", catalog_path.display()))?;

    let mut invoker = CommandInvoker::new(&config.tool.command);
    if let Some(marker) = &config.tool.fatal_marker {
        invoker = invoker.with_fatal_marker(marker);
    }

    let run = RegressionRun::new(config, Arc::new(invoker), Arc::new(PipeParser))?;

    // Ctrl-C stops new dispatch and drains in-flight jobs.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling run");
            let _ = cancel_tx.send(true);
        }
    });

    let progress = Arc::new(ProgressTracker::new());
    let sampler = {
        let progress = progress.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            interval.tick().await;
            loop {
                interval.tick().await;
                let snap = progress.snapshot();
                let eta = snap
                    .eta
                    .map(|d| format!("{}s", d.as_secs()))
                    .unwrap_or_else(|| "unknown".to_string());
                println!(
                    "{} {:>5.1}% ({}/{}) in flight: [{}] eta: {}",
                    "Progress:".cyan(),
                    snap.percent,
                    snap.completed,
                    snap.total,
                    snap.in_flight.join(", "),
                    eta
                );
            }
        })
    };

    let report = run.execute(&catalog, &progress, cancel_rx).await?;
    sampler.abort();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, verbose);
    }

    if !report.counts.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &RunReport, verbose: bool) {
    for entry in &report.entries {
        let status = entry.outcome.status;
        let label = match status {
            JobStatus::Succeeded => status.as_str().green(),
            JobStatus::Failed => status.as_str().red(),
            JobStatus::Skipped => status.as_str().yellow(),
            JobStatus::NotRun => status.as_str().dimmed(),
        };
        println!(
            "{:>4}  {:<10} {:<24} {:<12} {}",
            entry.ordinal, entry.regression_type, entry.unit_name, label, entry.outcome.result.status
        );
        if verbose && !entry.outcome.result.details.is_empty() {
            println!("      {}", entry.outcome.result.details.dimmed());
        }
    }

    let counts = report.counts;
    println!(
        "\n{} {} succeeded, {} failed, {} skipped, {} not run",
        if report.cancelled {
            "Cancelled:".yellow()
        } else {
            "Done:".green()
        },
        counts.succeeded,
        counts.failed,
        counts.skipped,
        counts.not_run
    );
}

fn handle_status_command(log: &PathBuf) -> Result<()> {
    let state = ResumeState::load(log);
    if state.is_empty() {
        println!("{}", "No prior outcomes recorded.".yellow());
        return Ok(());
    }
    let counts = state.status_counts();
    println!("{} {} prior outcomes", "Resume log:".cyan(), state.len());
    for status in [JobStatus::Succeeded, JobStatus::Failed] {
        if let Some(count) = counts.get(&status) {
            println!("  {:<10} {}", status.as_str(), count);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();
    info!("Starting regrun");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Run {
            config,
            catalog,
            resume_log,
            dry_run,
            json,
        } => {
            handle_run_command(
                config,
                catalog,
                resume_log.clone(),
                *dry_run,
                *json,
                cli.is_verbose(),
            )
            .await
        }
        Commands::Status { log } => handle_status_command(log),
    }
}
