//! Job identity and descriptor types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Identity of a job within one run.
///
/// Unique by `(regression_type, unit_name)` — the same unit may run under
/// several regression types, each as a separate job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId {
    pub regression_type: String,
    pub unit_name: String,
}

impl JobId {
    pub fn new(regression_type: impl Into<String>, unit_name: impl Into<String>) -> Self {
        Self {
            regression_type: regression_type.into(),
            unit_name: unit_name.into(),
        }
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.regression_type, self.unit_name)
    }
}

/// One unit's single analysis request for a given regression type.
///
/// Immutable once emitted by the queue builder. The ordinal is the job's
/// position in the deterministic queue order and doubles as a stable resume
/// key component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub regression_type: String,
    pub ordinal: usize,
    pub unit_name: String,
    pub chiplet: String,
    pub workarea: PathBuf,
}

impl Job {
    /// The job's identity key.
    pub fn id(&self) -> JobId {
        JobId::new(&self.regression_type, &self.unit_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job {
            regression_type: "nightly".to_string(),
            ordinal: 3,
            unit_name: "alu0".to_string(),
            chiplet: "core".to_string(),
            workarea: PathBuf::from("/work/alu0"),
        }
    }

    #[test]
    fn test_job_id_display() {
        let id = JobId::new("nightly", "alu0");
        assert_eq!(id.to_string(), "nightly/alu0");
    }

    #[test]
    fn test_job_id_from_job() {
        let job = sample_job();
        assert_eq!(job.id(), JobId::new("nightly", "alu0"));
    }

    #[test]
    fn test_job_id_equality_ignores_ordinal() {
        let mut other = sample_job();
        other.ordinal = 99;
        assert_eq!(sample_job().id(), other.id());
    }

    #[test]
    fn test_job_serialization_roundtrip() {
        let job = sample_job();
        let json = serde_json::to_string(&job).unwrap();
        let restored: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(job, restored);
    }
}
