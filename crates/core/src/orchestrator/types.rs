//! Types for the conversion orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::job::JobError;

/// Errors that can occur when starting or running a job.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Job store rejected the operation.
    #[error(transparent)]
    Job(#[from] JobError),

    /// An execution for this job is already active.
    #[error("job already running: {0}")]
    AlreadyRunning(String),

    /// The orchestrator is shutting down and accepts no new jobs.
    #[error("orchestrator is shutting down")]
    ShuttingDown,

    /// Fault outside any single file's conversion.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestratorStatus {
    /// Whether new jobs are accepted.
    pub accepting: bool,
    /// Jobs with an active execution, sorted.
    pub active_jobs: Vec<String>,
}
