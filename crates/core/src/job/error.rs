//! Error types for the job module.

use thiserror::Error;

use super::types::JobStatus;

/// Errors returned by job store operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// Submission rejected before a job was created.
    #[error("Invalid submission: {0}")]
    Validation(String),

    /// No job with this id.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the job's current state.
    #[error("Cannot {operation} job {job_id}: current state is {current}")]
    InvalidState {
        job_id: String,
        current: JobStatus,
        operation: String,
    },

    /// Store internals are unusable (poisoned lock).
    #[error("Job store error: {0}")]
    Internal(String),
}

impl JobError {
    pub(crate) fn invalid_state(
        job_id: impl Into<String>,
        current: JobStatus,
        operation: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            job_id: job_id.into(),
            current,
            operation: operation.into(),
        }
    }
}
