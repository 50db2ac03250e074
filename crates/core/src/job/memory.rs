//! In-memory job store.

use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

use super::error::JobError;
use super::store::JobStore;
use super::types::{FileDescriptor, FileOutcome, FileTask, Job, JobStatus};
use crate::metrics::JOBS_CREATED;

/// Process-local job registry.
///
/// The outer lock only guards the id → job map; every job has its own mutex,
/// so mutating one job never blocks another.
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Arc<Mutex<Job>>>>,
    output_root: PathBuf,
    max_batch_size: usize,
}

impl InMemoryJobStore {
    /// Creates a store whose jobs write outputs under `output_root/<job_id>`.
    pub fn new(output_root: impl Into<PathBuf>, max_batch_size: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            output_root: output_root.into(),
            max_batch_size,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn entry(&self, job_id: &str) -> Result<Arc<Mutex<Job>>, JobError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| JobError::Internal("job map lock poisoned".to_string()))?;
        jobs.get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    fn with_job<R>(
        &self,
        job_id: &str,
        f: impl FnOnce(&mut Job) -> Result<R, JobError>,
    ) -> Result<R, JobError> {
        let entry = self.entry(job_id)?;
        let mut job = entry
            .lock()
            .map_err(|_| JobError::Internal(format!("lock poisoned for job {}", job_id)))?;
        f(&mut job)
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, files: Vec<FileDescriptor>) -> Result<String, JobError> {
        if files.is_empty() {
            return Err(JobError::Validation("No files to convert".to_string()));
        }
        if files.len() > self.max_batch_size {
            return Err(JobError::Validation(format!(
                "Maximum {} files allowed, got {}",
                self.max_batch_size,
                files.len()
            )));
        }

        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| JobError::Internal("job map lock poisoned".to_string()))?;
        let job_id = loop {
            let id = uuid::Uuid::new_v4().to_string();
            if !jobs.contains_key(&id) {
                break id;
            }
        };
        let job = Job {
            job_id: job_id.clone(),
            files: files
                .into_iter()
                .map(|f| FileTask {
                    original_name: f.original_name,
                    source_path: f.source_path,
                    outcome: FileOutcome::NotStarted,
                })
                .collect(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            output_dir: self.output_root.join(&job_id),
        };

        debug!(job_id = %job_id, files = job.files.len(), "Job created");
        jobs.insert(job_id.clone(), Arc::new(Mutex::new(job)));
        drop(jobs);
        JOBS_CREATED.inc();

        Ok(job_id)
    }

    fn get(&self, job_id: &str) -> Result<Job, JobError> {
        self.with_job(job_id, |job| Ok(job.clone()))
    }

    fn list(&self) -> Result<Vec<Job>, JobError> {
        let entries: Vec<Arc<Mutex<Job>>> = self
            .jobs
            .read()
            .map_err(|_| JobError::Internal("job map lock poisoned".to_string()))?
            .values()
            .cloned()
            .collect();

        let mut jobs = Vec::with_capacity(entries.len());
        for entry in entries {
            let job = entry
                .lock()
                .map_err(|_| JobError::Internal("job lock poisoned".to_string()))?;
            jobs.push(job.clone());
        }
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    fn transition(&self, job_id: &str, new_status: JobStatus) -> Result<Job, JobError> {
        self.with_job(job_id, |job| {
            if !job.status.can_transition_to(new_status) {
                return Err(JobError::invalid_state(
                    job_id,
                    job.status,
                    format!("move to {}", new_status),
                ));
            }

            if new_status == JobStatus::Completed && !job.all_attempted() {
                return Err(JobError::invalid_state(
                    job_id,
                    job.status,
                    format!(
                        "complete with {} of {} files attempted",
                        job.attempted(),
                        job.files.len()
                    ),
                ));
            }

            let now = Utc::now();
            match new_status {
                JobStatus::Running => job.started_at = Some(now),
                JobStatus::Completed => job.completed_at = Some(now),
                JobStatus::Pending => {}
            }
            job.status = new_status;
            debug!(job_id = %job_id, status = %new_status, "Job transitioned");
            Ok(job.clone())
        })
    }

    fn record_outcome(
        &self,
        job_id: &str,
        index: usize,
        outcome: FileOutcome,
    ) -> Result<(), JobError> {
        self.with_job(job_id, |job| {
            if job.status != JobStatus::Running {
                return Err(JobError::invalid_state(
                    job_id,
                    job.status,
                    "record outcome for",
                ));
            }
            if !outcome.is_terminal() {
                return Err(JobError::invalid_state(
                    job_id,
                    job.status,
                    "reset a file outcome of",
                ));
            }
            let status = job.status;
            let task = job.files.get_mut(index).ok_or_else(|| {
                JobError::invalid_state(job_id, status, format!("record file #{} of", index))
            })?;
            if task.outcome.is_terminal() {
                return Err(JobError::invalid_state(
                    job_id,
                    status,
                    format!("rewrite outcome of file #{} of", index),
                ));
            }
            task.outcome = outcome;
            Ok(())
        })
    }

    fn remove(&self, job_id: &str) -> Result<Job, JobError> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| JobError::Internal("job map lock poisoned".to_string()))?;
        let entry = jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        let job = entry
            .lock()
            .map_err(|_| JobError::Internal(format!("lock poisoned for job {}", job_id)))?
            .clone();
        if job.status != JobStatus::Completed {
            return Err(JobError::invalid_state(job_id, job.status, "remove"));
        }
        jobs.remove(job_id);
        Ok(job)
    }
}
