//! Housekeeping implementation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::intake::{IntakeError, StagingArea};
use crate::job::{JobError, JobStatus, JobStore};
use crate::progress::ProgressHub;

#[derive(Debug, Error)]
pub enum HousekeepingError {
    #[error("job store error: {0}")]
    Job(#[from] JobError),

    #[error("staging error: {0}")]
    Intake(#[from] IntakeError),
}

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub jobs_removed: usize,
    pub uploads_removed: usize,
}

/// Deletes completed jobs and uploads older than the retention window.
pub struct Housekeeper {
    store: Arc<dyn JobStore>,
    staging: Arc<StagingArea>,
    hub: Arc<ProgressHub>,
    retention: Duration,
}

impl Housekeeper {
    pub fn new(
        store: Arc<dyn JobStore>,
        staging: Arc<StagingArea>,
        hub: Arc<ProgressHub>,
        retention: Duration,
    ) -> Self {
        Self {
            store,
            staging,
            hub,
            retention,
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn JobStore>,
        staging: Arc<StagingArea>,
        hub: Arc<ProgressHub>,
    ) -> Self {
        Self::new(
            store,
            staging,
            hub,
            Duration::from_secs(config.storage.retention_secs),
        )
    }

    /// Sweep everything older than the retention window.
    pub async fn sweep(&self) -> Result<SweepReport, HousekeepingError> {
        let retention = chrono::Duration::from_std(self.retention)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        self.sweep_before(Utc::now() - retention).await
    }

    /// Remove completed jobs finished before `cutoff` and uploads staged
    /// before it. Files of jobs still in the store are never touched.
    pub async fn sweep_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<SweepReport, HousekeepingError> {
        let mut report = SweepReport::default();
        let mut referenced: HashSet<PathBuf> = HashSet::new();

        for job in self.store.list()? {
            let expired = job.status == JobStatus::Completed
                && job.completed_at.map(|t| t < cutoff).unwrap_or(false);
            if !expired {
                referenced.extend(job.source_paths().map(|p| p.to_path_buf()));
                continue;
            }

            let job = match self.store.remove(&job.job_id) {
                Ok(job) => job,
                Err(e) => {
                    warn!(job_id = %job.job_id, error = %e, "Failed to remove expired job");
                    continue;
                }
            };

            if let Err(e) = tokio::fs::remove_dir_all(&job.output_dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(job_id = %job.job_id, dir = %job.output_dir.display(), error = %e, "Failed to remove job outputs");
                }
            }
            report.uploads_removed += self.staging.discard(job.source_paths()).await;
            self.hub.remove(&job.job_id);
            report.jobs_removed += 1;
            debug!(job_id = %job.job_id, "Removed expired job");
        }

        report.uploads_removed += self.staging.sweep_stale(cutoff, &referenced).await?;

        if report != SweepReport::default() {
            info!(
                jobs_removed = report.jobs_removed,
                uploads_removed = report.uploads_removed,
                "Housekeeping sweep finished"
            );
        }
        Ok(report)
    }

    /// Run [`sweep`](Self::sweep) every `interval` until shutdown is signalled.
    pub fn spawn_periodic(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Housekeeping loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Housekeeping loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = self.sweep().await {
                            warn!("Housekeeping error: {}", e);
                        }
                    }
                }
            }
            info!("Housekeeping loop stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{IntakeLimits, UploadedFile};
    use crate::job::{FileOutcome, InMemoryJobStore};
    use crate::progress::{ProgressEvent, ProgressPublisher};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: Arc<InMemoryJobStore>,
        staging: Arc<StagingArea>,
        hub: Arc<ProgressHub>,
        housekeeper: Housekeeper,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryJobStore::new(dir.path().join("outputs"), 5));
        let staging = Arc::new(StagingArea::new(
            dir.path().join("uploads"),
            IntakeLimits::default(),
        ));
        let hub = Arc::new(ProgressHub::new(8));
        let housekeeper = Housekeeper::new(
            store.clone(),
            staging.clone(),
            hub.clone(),
            Duration::from_secs(3600),
        );
        Fixture {
            _dir: dir,
            store,
            staging,
            hub,
            housekeeper,
        }
    }

    async fn job_with_upload(fx: &Fixture, complete: bool) -> String {
        let staged = fx
            .staging
            .stage_batch(vec![UploadedFile::new("a.pdf", None, b"%PDF-".to_vec())])
            .await
            .unwrap();
        let files = fx.staging.take(&[staged[0].file_id.clone()]).unwrap();
        let job_id = fx.store.create(files).unwrap();
        fx.store.transition(&job_id, JobStatus::Running).unwrap();
        let job = fx.store.get(&job_id).unwrap();
        std::fs::create_dir_all(&job.output_dir).unwrap();
        std::fs::write(job.output_path("a.docx"), b"PK").unwrap();
        fx.hub
            .publish(ProgressEvent::progress(&job_id, None, 0, 1));
        if complete {
            fx.store
                .record_outcome(&job_id, 0, FileOutcome::succeeded("a.docx"))
                .unwrap();
            fx.store.transition(&job_id, JobStatus::Completed).unwrap();
        }
        job_id
    }

    #[tokio::test]
    async fn test_recent_jobs_are_kept() {
        let fx = fixture();
        let job_id = job_with_upload(&fx, true).await;

        let report = fx.housekeeper.sweep().await.unwrap();
        assert_eq!(report, SweepReport::default());
        assert!(fx.store.get(&job_id).is_ok());
    }

    #[tokio::test]
    async fn test_expired_completed_job_is_removed() {
        let fx = fixture();
        let job_id = job_with_upload(&fx, true).await;
        let job = fx.store.get(&job_id).unwrap();

        let future = Utc::now() + chrono::Duration::seconds(10);
        let report = fx.housekeeper.sweep_before(future).await.unwrap();

        assert_eq!(report.jobs_removed, 1);
        assert_eq!(report.uploads_removed, 1);
        assert!(fx.store.get(&job_id).is_err());
        assert!(!job.output_dir.exists());
        assert!(!job.files[0].source_path.exists());
        assert_eq!(fx.hub.topic_count(), 0);
    }

    #[tokio::test]
    async fn test_running_job_is_untouched() {
        let fx = fixture();
        let job_id = job_with_upload(&fx, false).await;
        let job = fx.store.get(&job_id).unwrap();

        let future = Utc::now() + chrono::Duration::seconds(10);
        let report = fx.housekeeper.sweep_before(future).await.unwrap();

        assert_eq!(report, SweepReport::default());
        assert!(job.files[0].source_path.exists());
        assert!(job.output_path("a.docx").exists());
        assert_eq!(fx.hub.topic_count(), 1);
    }

    #[tokio::test]
    async fn test_unsubmitted_uploads_expire() {
        let fx = fixture();
        fx.staging
            .stage_batch(vec![UploadedFile::new("a.pdf", None, b"%PDF-".to_vec())])
            .await
            .unwrap();

        let future = Utc::now() + chrono::Duration::seconds(10);
        let report = fx.housekeeper.sweep_before(future).await.unwrap();
        assert_eq!(report.uploads_removed, 1);
        assert_eq!(fx.staging.pending(), 0);
    }

    #[tokio::test]
    async fn test_periodic_loop_stops_on_shutdown() {
        let fx = fixture();
        let (tx, rx) = broadcast::channel(1);
        let housekeeper = Arc::new(fx.housekeeper);
        let handle = housekeeper.spawn_periodic(Duration::from_secs(3600), rx);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
