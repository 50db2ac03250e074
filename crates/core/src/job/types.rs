//! Types for the job module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
        }
    }

    /// Whether `next` is the single allowed successor of this status.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running) | (JobStatus::Running, JobStatus::Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one file's conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileOutcome {
    NotStarted,
    Succeeded { output_name: String },
    Failed { reason: String },
}

impl FileOutcome {
    pub fn succeeded(output_name: impl Into<String>) -> Self {
        Self::Succeeded {
            output_name: output_name.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FileOutcome::NotStarted)
    }
}

/// An uploaded file handed to the store at job creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Name shown to the user (untrusted).
    pub original_name: String,
    /// Staged upload location.
    pub source_path: PathBuf,
}

impl FileDescriptor {
    pub fn new(original_name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            original_name: original_name.into(),
            source_path: source_path.into(),
        }
    }
}

/// One file's conversion unit within a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub original_name: String,
    pub source_path: PathBuf,
    pub outcome: FileOutcome,
}

/// A submitted batch.
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: String,
    pub files: Vec<FileTask>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Directory holding this job's converted documents.
    pub output_dir: PathBuf,
}

impl Job {
    pub fn total_files(&self) -> usize {
        self.files.len()
    }

    /// Number of files with a terminal outcome.
    pub fn attempted(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_terminal()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Succeeded { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed { .. }))
            .count()
    }

    /// Whether every file has been attempted exactly once.
    pub fn all_attempted(&self) -> bool {
        self.attempted() == self.files.len()
    }

    /// The task whose successful output is named `output_name`.
    pub fn succeeded_task(&self, output_name: &str) -> Option<&FileTask> {
        self.files.iter().find(|f| {
            matches!(&f.outcome, FileOutcome::Succeeded { output_name: name } if name == output_name)
        })
    }

    /// Location of an output document of this job.
    pub fn output_path(&self, output_name: &str) -> PathBuf {
        self.output_dir.join(output_name)
    }

    /// Staged sources referenced by this job.
    pub fn source_paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.source_path.as_path())
    }
}
