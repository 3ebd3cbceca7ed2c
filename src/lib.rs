//! regrun - bounded-concurrency regression run orchestrator
//!
//! Runs many independent, long-running analysis jobs (one per named unit)
//! against an external tool, with per-job retry/timeout supervision, a
//! crash-resumable append-only state log, progress/ETA estimation, and
//! deterministic result aggregation despite out-of-order completion.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod invoker;
pub mod pool;
pub mod progress;
pub mod queue;
pub mod resume;
pub mod runner;
pub mod supervisor;

pub use error::{RegrunError, Result};
