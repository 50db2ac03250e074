//! Conversion orchestrator implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::job::{FileDescriptor, FileOutcome, Job, JobStatus, JobStore};
use crate::metrics::{CONVERSION_DURATION, FILE_CONVERSIONS, JOBS_ACTIVE, JOBS_COMPLETED};
use crate::progress::{ProgressEvent, ProgressPublisher};
use crate::sanitize::unique_output_names;
use crate::transcoder::{TranscodeRequest, Transcoder};

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, OrchestratorStatus};

/// Reason recorded for files lost to an orchestrator fault.
const REASON_INTERNAL: &str = "internal error";
/// Reason recorded for files skipped after cancellation.
const REASON_CANCELLED: &str = "cancelled";
/// Reason recorded when a conversion exceeds its time budget.
const REASON_TIMEOUT: &str = "timeout";

type ActiveJobs = Arc<RwLock<HashMap<String, Arc<AtomicBool>>>>;

/// Runs conversion jobs, one tokio task per job.
pub struct ConversionOrchestrator {
    worker: Worker,
    accepting: Arc<AtomicBool>,
    active: ActiveJobs,
}

/// Shared handles needed inside a job's task.
#[derive(Clone)]
struct Worker {
    config: OrchestratorConfig,
    store: Arc<dyn JobStore>,
    transcoder: Arc<dyn Transcoder>,
    publisher: Arc<dyn ProgressPublisher>,
}

/// Why the remaining files of a job were not attempted.
#[derive(Debug, Clone, Copy)]
enum Abort {
    Internal,
    Cancelled,
}

impl Abort {
    fn reason(self) -> &'static str {
        match self {
            Abort::Internal => REASON_INTERNAL,
            Abort::Cancelled => REASON_CANCELLED,
        }
    }
}

impl ConversionOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn JobStore>,
        transcoder: Arc<dyn Transcoder>,
        publisher: Arc<dyn ProgressPublisher>,
    ) -> Self {
        Self {
            worker: Worker {
                config,
                store,
                transcoder,
                publisher,
            },
            accepting: Arc::new(AtomicBool::new(true)),
            active: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a job for `files` and start it in the background.
    ///
    /// Returns the new job id without waiting for any conversion.
    pub async fn submit(&self, files: Vec<FileDescriptor>) -> Result<String, OrchestratorError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(OrchestratorError::ShuttingDown);
        }
        let job_id = self.worker.store.create(files)?;
        self.start(&job_id).await?;
        Ok(job_id)
    }

    /// Start a pending job in the background.
    pub async fn start(&self, job_id: &str) -> Result<(), OrchestratorError> {
        let (job, cancel) = self.begin(job_id).await?;

        let worker = self.worker.clone();
        let active = Arc::clone(&self.active);
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            worker.execute(job, cancel).await;
            active.write().await.remove(&job_id);
        });

        Ok(())
    }

    /// Run a pending job to completion on the current task.
    pub async fn run(&self, job_id: &str) -> Result<Job, OrchestratorError> {
        let (job, cancel) = self.begin(job_id).await?;
        let finished = self.worker.execute(job, cancel).await;
        self.active.write().await.remove(job_id);
        Ok(finished)
    }

    /// Registers the job as active and moves it to `running`.
    async fn begin(&self, job_id: &str) -> Result<(Job, Arc<AtomicBool>), OrchestratorError> {
        let cancel = Arc::new(AtomicBool::new(false));
        {
            let mut active = self.active.write().await;
            if active.contains_key(job_id) {
                return Err(OrchestratorError::AlreadyRunning(job_id.to_string()));
            }
            active.insert(job_id.to_string(), Arc::clone(&cancel));
        }

        match self.worker.store.transition(job_id, JobStatus::Running) {
            Ok(job) => Ok((job, cancel)),
            Err(e) => {
                self.active.write().await.remove(job_id);
                Err(e.into())
            }
        }
    }

    /// Ask a running job to stop before its next file.
    ///
    /// Returns false if the job has no active execution.
    pub async fn cancel(&self, job_id: &str) -> bool {
        match self.active.read().await.get(job_id) {
            Some(flag) => {
                info!(job_id = %job_id, "Cancelling job");
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Stop accepting jobs, cancel every active one and wait for them to
    /// wind down (bounded by the configured grace period).
    pub async fn stop(&self) {
        if !self.accepting.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator already stopped");
            return;
        }

        info!("Stopping conversion orchestrator");

        for flag in self.active.read().await.values() {
            flag.store(true, Ordering::SeqCst);
        }

        let deadline = Instant::now() + Duration::from_millis(self.worker.config.shutdown_grace_ms);
        loop {
            let remaining = self.active.read().await.len();
            if remaining == 0 {
                break;
            }
            if Instant::now() >= deadline {
                warn!(remaining, "Jobs still running after shutdown grace period");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        info!("Conversion orchestrator stopped");
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let mut active_jobs: Vec<String> = self.active.read().await.keys().cloned().collect();
        active_jobs.sort();
        OrchestratorStatus {
            accepting: self.accepting.load(Ordering::Relaxed),
            active_jobs,
        }
    }

    pub async fn is_active(&self, job_id: &str) -> bool {
        self.active.read().await.contains_key(job_id)
    }
}

impl Worker {
    /// Processes every file of a running job and completes it.
    ///
    /// Always ends with the job completed (unless the store itself fails)
    /// and exactly one `complete` event published.
    async fn execute(&self, mut job: Job, cancel: Arc<AtomicBool>) -> Job {
        let job_id = job.job_id.clone();
        let total = job.total_files();
        let started = Instant::now();
        JOBS_ACTIVE.inc();

        info!(job_id = %job_id, files = total, "Starting conversion job");
        self.publisher
            .publish(ProgressEvent::progress(&job_id, None, 0, total));

        let names: Vec<&str> = job.files.iter().map(|f| f.original_name.as_str()).collect();
        let output_names = unique_output_names(&names, self.transcoder.output_extension());

        let mut abort: Option<(Abort, usize)> = None;
        if let Err(e) = tokio::fs::create_dir_all(&job.output_dir).await {
            error!(job_id = %job_id, dir = %job.output_dir.display(), error = %e, "Failed to create output directory");
            abort = Some((Abort::Internal, 0));
        }

        if abort.is_none() {
            for idx in 0..total {
                if cancel.load(Ordering::SeqCst) {
                    info!(job_id = %job_id, remaining = total - idx, "Job cancelled");
                    abort = Some((Abort::Cancelled, idx));
                    break;
                }

                let name = job.files[idx].original_name.clone();
                self.publisher
                    .publish(ProgressEvent::progress(&job_id, Some(&name), idx, total));

                let outcome = match self.convert_one(&job, idx, &output_names[idx]).await {
                    Some(outcome) => outcome,
                    None => {
                        abort = Some((Abort::Internal, idx));
                        break;
                    }
                };

                if let Err(e) = self.store.record_outcome(&job_id, idx, outcome.clone()) {
                    error!(job_id = %job_id, file = idx, error = %e, "Failed to record file outcome");
                    abort = Some((Abort::Internal, idx));
                    break;
                }
                job.files[idx].outcome = outcome;

                self.publisher
                    .publish(ProgressEvent::progress(&job_id, Some(&name), idx + 1, total));
            }
        }

        if let Some((kind, from)) = abort {
            self.fail_remaining(&mut job, from, kind);
            self.publisher
                .publish(ProgressEvent::progress(&job_id, None, total, total));
        }

        let job = match self.store.transition(&job_id, JobStatus::Completed) {
            Ok(completed) => completed,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to complete job");
                job
            }
        };

        let result = match (job.succeeded(), job.failed()) {
            (_, 0) => "all_succeeded",
            (0, _) => "all_failed",
            _ => "partial",
        };
        JOBS_COMPLETED.with_label_values(&[result]).inc();
        JOBS_ACTIVE.dec();

        info!(
            job_id = %job_id,
            converted = job.succeeded(),
            failed = job.failed(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Conversion job completed"
        );
        self.publisher.publish(ProgressEvent::complete(&job));

        job
    }

    /// Converts one file. `None` means an internal fault that must abort
    /// the rest of the job.
    async fn convert_one(&self, job: &Job, idx: usize, output_name: &str) -> Option<FileOutcome> {
        let task = &job.files[idx];

        match tokio::fs::try_exists(&task.source_path).await {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                error!(
                    job_id = %job.job_id,
                    file = %task.original_name,
                    path = %task.source_path.display(),
                    "Staged source missing"
                );
                FILE_CONVERSIONS.with_label_values(&["internal"]).inc();
                return None;
            }
        }

        let output_path = job.output_path(output_name);
        let request = TranscodeRequest {
            job_id: job.job_id.clone(),
            input_path: task.source_path.clone(),
            output_path: output_path.clone(),
        };

        debug!(job_id = %job.job_id, file = %task.original_name, output = %output_name, "Converting file");
        let start = Instant::now();
        let result = tokio::time::timeout(
            self.config.conversion_timeout(),
            self.transcoder.transcode(request),
        )
        .await;
        let elapsed = start.elapsed().as_secs_f64();

        let (outcome, label) = match result {
            Ok(Ok(converted)) => {
                debug!(
                    job_id = %job.job_id,
                    file = %task.original_name,
                    size = converted.output_size_bytes,
                    "File converted"
                );
                (FileOutcome::succeeded(output_name), "succeeded")
            }
            Ok(Err(e)) => {
                warn!(job_id = %job.job_id, file = %task.original_name, error = %e, "File conversion failed");
                let label = if e.reason() == REASON_TIMEOUT { "timeout" } else { "failed" };
                (FileOutcome::failed(e.reason()), label)
            }
            Err(_) => {
                warn!(
                    job_id = %job.job_id,
                    file = %task.original_name,
                    timeout_secs = self.config.conversion_timeout_secs,
                    "File conversion timed out"
                );
                (FileOutcome::failed(REASON_TIMEOUT), "timeout")
            }
        };

        if !matches!(outcome, FileOutcome::Succeeded { .. }) {
            let _ = tokio::fs::remove_file(&output_path).await;
        }

        FILE_CONVERSIONS.with_label_values(&[label]).inc();
        CONVERSION_DURATION
            .with_label_values(&[label])
            .observe(elapsed);

        Some(outcome)
    }

    /// Fails every file from `from` on that has no outcome yet.
    fn fail_remaining(&self, job: &mut Job, from: usize, kind: Abort) {
        for idx in from..job.total_files() {
            if job.files[idx].outcome.is_terminal() {
                continue;
            }
            let outcome = FileOutcome::failed(kind.reason());
            if let Err(e) = self.store.record_outcome(&job.job_id, idx, outcome.clone()) {
                error!(job_id = %job.job_id, file = idx, error = %e, "Failed to record file outcome");
            }
            job.files[idx].outcome = outcome;
        }
    }
}
