//! Resolves `(job_id, output_name)` to a converted document on disk.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::job::{JobError, JobStatus, JobStore};
use crate::transcoder::DOCX_CONTENT_TYPE;

/// Errors returned by artifact lookups.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Unknown job, job not completed, no such converted file, or the file
    /// was already cleaned up.
    #[error("File not found: {name} (job {job_id})")]
    NotFound { job_id: String, name: String },

    #[error("Artifact lookup failed: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArtifactError {
    fn not_found(job_id: &str, name: &str) -> Self {
        Self::NotFound {
            job_id: job_id.to_string(),
            name: name.to_string(),
        }
    }
}

/// A converted document ready to be streamed.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub job_id: String,
    /// Download name (the output name).
    pub file_name: String,
    /// Upload name the document was converted from.
    pub source_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub content_type: &'static str,
}

impl Artifact {
    /// Open the document for reading.
    pub async fn open(&self) -> Result<tokio::fs::File, ArtifactError> {
        Ok(tokio::fs::File::open(&self.path).await?)
    }

    /// Read the whole document.
    pub async fn read(&self) -> Result<Vec<u8>, ArtifactError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Read-only access to the outputs of completed jobs.
#[derive(Clone)]
pub struct ArtifactGateway {
    store: Arc<dyn JobStore>,
}

impl ArtifactGateway {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Look up a converted document.
    ///
    /// Only documents of `completed` jobs are visible, and only under a name
    /// recorded as a successful outcome of that job.
    pub async fn resolve(&self, job_id: &str, output_name: &str) -> Result<Artifact, ArtifactError> {
        if !is_plain_file_name(output_name) {
            debug!(job_id = %job_id, name = %output_name, "Rejected artifact name");
            return Err(ArtifactError::not_found(job_id, output_name));
        }

        let job = match self.store.get(job_id) {
            Ok(job) => job,
            Err(JobError::NotFound(_)) => return Err(ArtifactError::not_found(job_id, output_name)),
            Err(e) => return Err(ArtifactError::Internal(e.to_string())),
        };

        if job.status != JobStatus::Completed {
            return Err(ArtifactError::not_found(job_id, output_name));
        }

        let task = job
            .succeeded_task(output_name)
            .ok_or_else(|| ArtifactError::not_found(job_id, output_name))?;

        let path = job.output_path(output_name);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(ArtifactError::not_found(job_id, output_name)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(job_id = %job_id, path = %path.display(), "Converted file missing on disk");
                return Err(ArtifactError::not_found(job_id, output_name));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Artifact {
            job_id: job.job_id.clone(),
            file_name: output_name.to_string(),
            source_name: task.original_name.clone(),
            path,
            size_bytes: metadata.len(),
            content_type: DOCX_CONTENT_TYPE,
        })
    }
}

/// Whether `name` is a single normal path component.
fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FileDescriptor, FileOutcome, InMemoryJobStore};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<InMemoryJobStore>, ArtifactGateway, String) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryJobStore::new(dir.path(), 5));
        let gateway = ArtifactGateway::new(store.clone());
        let job_id = store
            .create(vec![
                FileDescriptor::new("A.pdf", "/staging/a.pdf"),
                FileDescriptor::new("B.pdf", "/staging/b.pdf"),
            ])
            .unwrap();
        store.transition(&job_id, JobStatus::Running).unwrap();
        (dir, store, gateway, job_id)
    }

    fn finish(store: &InMemoryJobStore, job_id: &str) {
        let job = store.get(job_id).unwrap();
        std::fs::create_dir_all(&job.output_dir).unwrap();
        std::fs::write(job.output_path("A.docx"), b"PK").unwrap();
        store
            .record_outcome(job_id, 0, FileOutcome::succeeded("A.docx"))
            .unwrap();
        store
            .record_outcome(job_id, 1, FileOutcome::failed("conversion failed"))
            .unwrap();
        store.transition(job_id, JobStatus::Completed).unwrap();
    }

    #[tokio::test]
    async fn test_resolve_completed_output() {
        let (_dir, store, gateway, job_id) = setup();
        finish(&store, &job_id);

        let artifact = gateway.resolve(&job_id, "A.docx").await.unwrap();
        assert_eq!(artifact.size_bytes, 2);
        assert_eq!(artifact.source_name, "A.pdf");
        assert_eq!(artifact.content_type, DOCX_CONTENT_TYPE);
        assert_eq!(artifact.read().await.unwrap(), b"PK");
    }

    #[tokio::test]
    async fn test_running_job_hides_outputs() {
        let (_dir, store, gateway, job_id) = setup();
        let job = store.get(&job_id).unwrap();
        std::fs::create_dir_all(&job.output_dir).unwrap();
        std::fs::write(job.output_path("A.docx"), b"PK").unwrap();
        store
            .record_outcome(&job_id, 0, FileOutcome::succeeded("A.docx"))
            .unwrap();

        let err = gateway.resolve(&job_id, "A.docx").await.unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_unknown_names_are_not_found() {
        let (_dir, store, gateway, job_id) = setup();
        finish(&store, &job_id);

        for name in ["B.docx", "../A.docx", "x/A.docx", "..", ""] {
            let err = gateway.resolve(&job_id, name).await.unwrap_err();
            assert!(matches!(err, ArtifactError::NotFound { .. }), "{}", name);
        }
        assert!(matches!(
            gateway.resolve("no-such-job", "A.docx").await,
            Err(ArtifactError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_deleted_file_is_not_found() {
        let (_dir, store, gateway, job_id) = setup();
        finish(&store, &job_id);
        std::fs::remove_file(store.get(&job_id).unwrap().output_path("A.docx")).unwrap();

        assert!(matches!(
            gateway.resolve(&job_id, "A.docx").await,
            Err(ArtifactError::NotFound { .. })
        ));
    }

    #[test]
    fn test_plain_file_name() {
        assert!(is_plain_file_name("report.docx"));
        assert!(!is_plain_file_name("."));
        assert!(!is_plain_file_name("a/b"));
        assert!(!is_plain_file_name("a\\b"));
    }
}
