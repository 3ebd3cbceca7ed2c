//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: execute a regression run from a config and catalog file
//! - status: summarize a resume log without running anything

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// regrun - bounded-concurrency regression run orchestrator
#[derive(Parser, Debug)]
#[command(name = "regrun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a regression run
    Run {
        /// Config file path
        #[arg(short, long, default_value = "regrun.yml")]
        config: PathBuf,

        /// Unit catalog file path
        #[arg(long)]
        catalog: PathBuf,

        /// Resume log path, overriding the config
        #[arg(long)]
        resume_log: Option<PathBuf>,

        /// Build the queue but execute nothing
        #[arg(long)]
        dry_run: bool,

        /// Emit the final report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Summarize a resume log
    Status {
        /// Resume log to read
        log: PathBuf,
    },
}
