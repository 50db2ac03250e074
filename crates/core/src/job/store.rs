//! Job storage trait.

use super::error::JobError;
use super::types::{FileDescriptor, FileOutcome, Job, JobStatus};

/// Trait for job storage backends.
///
/// Mutations of a single job are serialized; different jobs may be mutated
/// concurrently.
pub trait JobStore: Send + Sync {
    /// Create a `pending` job for an ordered batch and return its id.
    ///
    /// Fails with [`JobError::Validation`] unless `1 <= files.len() <= max batch size`.
    fn create(&self, files: Vec<FileDescriptor>) -> Result<String, JobError>;

    /// Snapshot of a job.
    fn get(&self, job_id: &str) -> Result<Job, JobError>;

    /// Snapshots of all jobs, oldest first.
    fn list(&self) -> Result<Vec<Job>, JobError>;

    /// Move a job to `new_status`. Only `pending → running → completed` is allowed.
    fn transition(&self, job_id: &str, new_status: JobStatus) -> Result<Job, JobError>;

    /// Record the terminal outcome of the file at `index`.
    ///
    /// The job must be running and the file's outcome still `not_started`.
    fn record_outcome(&self, job_id: &str, index: usize, outcome: FileOutcome)
        -> Result<(), JobError>;

    /// Permanently remove a completed job. Returns the removed job.
    fn remove(&self, job_id: &str) -> Result<Job, JobError>;
}
