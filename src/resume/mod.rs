//! Append-only resume log.
//!
//! One line per terminal outcome:
//! `regression_type|ordinal_index|unit_name|ISO-8601_timestamp|status`.
//! The file is appended to, never rewritten, so a crashed run leaves at
//! worst one truncated trailing line. Loading is lenient: anything that
//! does not parse is skipped with a warning and a missing or unreadable
//! file degrades to "no prior state" — resume problems never abort a run.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{JobId, JobStatus};
use crate::error::Result;

/// Serialized writer for the resume log.
///
/// The worker pool's event loop is the single logical writer; completion
/// events reach it sequentially, so records never interleave.
#[derive(Debug)]
pub struct ResumeWriter {
    path: PathBuf,
    file: File,
}

impl ResumeWriter {
    /// Open the log for appending, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Append one terminal outcome record.
    pub fn append(
        &mut self,
        regression_type: &str,
        ordinal: usize,
        unit_name: &str,
        status: JobStatus,
    ) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        writeln!(
            self.file,
            "{regression_type}|{ordinal}|{unit_name}|{timestamp}|{status}"
        )?;
        self.file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One parsed resume record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeRecord {
    pub ordinal: usize,
    pub timestamp: DateTime<Utc>,
    pub status: JobStatus,
}

/// Prior terminal outcomes loaded at startup.
#[derive(Debug, Default)]
pub struct ResumeState {
    records: HashMap<JobId, ResumeRecord>,
}

impl ResumeState {
    /// Load prior state from a resume log. Never fails: unreadable files
    /// yield empty state.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no prior resume log, starting fresh");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "resume log unreadable, starting fresh"
                );
                return Self::default();
            }
        };
        let state = Self::parse(&raw);
        tracing::info!(
            path = %path.display(),
            prior_outcomes = state.len(),
            "resume log loaded"
        );
        state
    }

    /// Parse log text, skipping malformed lines and a truncated trailing
    /// line.
    pub fn parse(raw: &str) -> Self {
        let complete = if raw.is_empty() || raw.ends_with('\n') {
            raw
        } else {
            match raw.rfind('\n') {
                Some(end) => {
                    tracing::warn!("discarding truncated trailing resume record");
                    &raw[..=end]
                }
                None => {
                    tracing::warn!("discarding truncated trailing resume record");
                    ""
                }
            }
        };

        let mut records = HashMap::new();
        for (index, line) in complete.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((id, record)) => {
                    records.insert(id, record);
                }
                None => {
                    tracing::warn!(line = index + 1, "skipping malformed resume record");
                }
            }
        }
        Self { records }
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &JobId) -> Option<&ResumeRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count of records per terminal status, for summaries.
    pub fn status_counts(&self) -> HashMap<JobStatus, usize> {
        let mut counts = HashMap::new();
        for record in self.records.values() {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        counts
    }
}

fn parse_line(line: &str) -> Option<(JobId, ResumeRecord)> {
    let mut fields = line.split('|');
    let regression_type = fields.next()?;
    let ordinal = fields.next()?.parse().ok()?;
    let unit_name = fields.next()?;
    let timestamp = DateTime::parse_from_rfc3339(fields.next()?)
        .ok()?
        .with_timezone(&Utc);
    let status = JobStatus::parse(fields.next()?)?;
    if fields.next().is_some() || regression_type.is_empty() || unit_name.is_empty() {
        return None;
    }
    Some((
        JobId::new(regression_type, unit_name),
        ResumeRecord {
            ordinal,
            timestamp,
            status,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resume.log");

        {
            let mut writer = ResumeWriter::open(&path).unwrap();
            writer.append("nightly", 0, "alu0", JobStatus::Succeeded).unwrap();
            writer.append("nightly", 1, "alu1", JobStatus::Failed).unwrap();
        }

        let state = ResumeState::load(&path);
        assert_eq!(state.len(), 2);
        let record = state.get(&JobId::new("nightly", "alu0")).unwrap();
        assert_eq!(record.ordinal, 0);
        assert_eq!(record.status, JobStatus::Succeeded);
        assert_eq!(
            state.get(&JobId::new("nightly", "alu1")).unwrap().status,
            JobStatus::Failed
        );
        assert!(!state.contains(&JobId::new("weekly", "alu0")));
    }

    #[test]
    fn test_appends_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resume.log");

        {
            let mut writer = ResumeWriter::open(&path).unwrap();
            writer.append("nightly", 0, "alu0", JobStatus::Succeeded).unwrap();
        }
        {
            let mut writer = ResumeWriter::open(&path).unwrap();
            writer.append("nightly", 1, "alu1", JobStatus::Succeeded).unwrap();
        }

        let state = ResumeState::load(&path);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let temp = TempDir::new().unwrap();
        let state = ResumeState::load(&temp.path().join("absent.log"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let raw = "nightly|0|alu0|2026-08-30T10:00:00Z|SUCCEEDED\n\
                   this is not a record\n\
                   nightly|x|alu1|2026-08-30T10:00:00Z|SUCCEEDED\n\
                   nightly|2|alu2|not-a-timestamp|SUCCEEDED\n\
                   nightly|3|alu3|2026-08-30T10:00:00Z|EXPLODED\n\
                   nightly|4|alu4|2026-08-30T10:00:00Z|FAILED\n";
        let state = ResumeState::parse(raw);
        assert_eq!(state.len(), 2);
        assert!(state.contains(&JobId::new("nightly", "alu0")));
        assert!(state.contains(&JobId::new("nightly", "alu4")));
    }

    #[test]
    fn test_truncated_trailing_line_discarded() {
        let raw = "nightly|0|alu0|2026-08-30T10:00:00Z|SUCCEEDED\n\
                   nightly|1|alu1|2026-08-30T10:0";
        let state = ResumeState::parse(raw);
        assert_eq!(state.len(), 1);
        assert!(state.contains(&JobId::new("nightly", "alu0")));
    }

    #[test]
    fn test_entirely_truncated_log() {
        let state = ResumeState::parse("nightly|0|alu0|2026-08");
        assert!(state.is_empty());
    }

    #[test]
    fn test_blank_lines_ignored() {
        let raw = "\nnightly|0|alu0|2026-08-30T10:00:00Z|SUCCEEDED\n\n";
        let state = ResumeState::parse(raw);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_extra_field_is_malformed() {
        let raw = "nightly|0|alu0|2026-08-30T10:00:00Z|SUCCEEDED|extra\n";
        let state = ResumeState::parse(raw);
        assert!(state.is_empty());
    }

    #[test]
    fn test_status_counts() {
        let raw = "nightly|0|a|2026-08-30T10:00:00Z|SUCCEEDED\n\
                   nightly|1|b|2026-08-30T10:00:00Z|SUCCEEDED\n\
                   nightly|2|c|2026-08-30T10:00:00Z|FAILED\n";
        let counts = ResumeState::parse(raw).status_counts();
        assert_eq!(counts.get(&JobStatus::Succeeded), Some(&2));
        assert_eq!(counts.get(&JobStatus::Failed), Some(&1));
    }

    #[test]
    fn test_writer_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state").join("resume.log");
        let mut writer = ResumeWriter::open(&path).unwrap();
        writer.append("nightly", 0, "alu0", JobStatus::Succeeded).unwrap();
        assert!(path.exists());
        assert_eq!(writer.path(), path);
    }

    #[test]
    fn test_log_line_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("resume.log");
        let mut writer = ResumeWriter::open(&path).unwrap();
        writer.append("nightly", 7, "dcache", JobStatus::Succeeded).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let fields: Vec<&str> = raw.trim_end().split('|').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], "nightly");
        assert_eq!(fields[1], "7");
        assert_eq!(fields[2], "dcache");
        assert!(DateTime::parse_from_rfc3339(fields[3]).is_ok());
        assert_eq!(fields[4], "SUCCEEDED");
    }
}
