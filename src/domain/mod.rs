//! Domain types for regression jobs and their outcomes.

pub mod attempt;
pub mod job;
pub mod outcome;

pub use attempt::{Attempt, ExitClass};
pub use job::{Job, JobId};
pub use outcome::{AnalysisResult, JobOutcome, JobStatus, ResultStatus};
