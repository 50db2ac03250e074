//! Progress event payloads.

use serde::{Deserialize, Serialize};

use crate::job::{FileOutcome, Job};

/// A successfully converted file in a completion summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedFile {
    pub original_name: String,
    pub output_name: String,
}

/// Event emitted while a job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress {
        job_id: String,
        /// Display name of the file being worked on; `None` before the first file.
        current_file: Option<String>,
        current: usize,
        total: usize,
        percentage: u8,
    },
    /// Last event of a job.
    Complete {
        job_id: String,
        total_converted: usize,
        total_failed: usize,
        converted_files: Vec<ConvertedFile>,
        failed_files: Vec<String>,
    },
}

impl ProgressEvent {
    pub fn progress(
        job_id: impl Into<String>,
        current_file: Option<&str>,
        current: usize,
        total: usize,
    ) -> Self {
        Self::Progress {
            job_id: job_id.into(),
            current_file: current_file.map(str::to_string),
            current,
            total,
            percentage: percentage(current, total),
        }
    }

    /// Summary event for a job whose files all have outcomes.
    pub fn complete(job: &Job) -> Self {
        let mut converted_files = Vec::new();
        let mut failed_files = Vec::new();
        for task in &job.files {
            match &task.outcome {
                FileOutcome::Succeeded { output_name } => converted_files.push(ConvertedFile {
                    original_name: task.original_name.clone(),
                    output_name: output_name.clone(),
                }),
                FileOutcome::Failed { .. } => failed_files.push(task.original_name.clone()),
                FileOutcome::NotStarted => {}
            }
        }

        Self::Complete {
            job_id: job.job_id.clone(),
            total_converted: converted_files.len(),
            total_failed: failed_files.len(),
            converted_files,
            failed_files,
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            Self::Progress { job_id, .. } | Self::Complete { job_id, .. } => job_id,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// Short name used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Complete { .. } => "complete",
        }
    }
}

fn percentage(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((current.min(total) * 100) / total) as u8
}
