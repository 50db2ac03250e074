//! Staging directory and file handle registry.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use super::error::IntakeError;
use super::types::{IntakeLimits, StagedFile, UploadedFile};
use crate::job::FileDescriptor;
use crate::sanitize::{display_name, has_pdf_extension, secure_filename};

/// Content types accepted for PDF uploads.
///
/// Browsers send `application/octet-stream` (or nothing) for types they
/// don't recognize.
const ACCEPTED_CONTENT_TYPES: &[&str] = &["application/pdf", "application/octet-stream"];

/// Holds uploaded files between upload and job submission.
pub struct StagingArea {
    dir: PathBuf,
    limits: IntakeLimits,
    registry: Mutex<HashMap<String, StagedFile>>,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>, limits: IntakeLimits) -> Self {
        Self {
            dir: dir.into(),
            limits,
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn limits(&self) -> IntakeLimits {
        self.limits
    }

    /// Validates the batch and writes it to the staging directory.
    ///
    /// Files with an empty name are skipped. Nothing is written unless
    /// every remaining file passes validation.
    pub async fn stage_batch(
        &self,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<StagedFile>, IntakeError> {
        let files: Vec<UploadedFile> = files
            .into_iter()
            .filter(|f| !display_name(&f.name).is_empty())
            .collect();

        self.validate_batch(&files)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut staged: Vec<StagedFile> = Vec::with_capacity(files.len());
        for file in files {
            match self.write_one(file).await {
                Ok(entry) => staged.push(entry),
                Err(e) => {
                    for entry in &staged {
                        let _ = tokio::fs::remove_file(&entry.path).await;
                    }
                    return Err(e);
                }
            }
        }

        {
            let mut registry = self.registry.lock().map_err(|_| IntakeError::Internal)?;
            for entry in &staged {
                registry.insert(entry.file_id.clone(), entry.clone());
            }
        }

        info!(count = staged.len(), "Staged uploaded files");
        Ok(staged)
    }

    fn validate_batch(&self, files: &[UploadedFile]) -> Result<(), IntakeError> {
        if files.is_empty() {
            return Err(IntakeError::NoFiles);
        }
        if files.len() > self.limits.max_batch_size {
            return Err(IntakeError::TooManyFiles {
                count: files.len(),
                max: self.limits.max_batch_size,
            });
        }

        for file in files {
            let name = display_name(&file.name);
            if !has_pdf_extension(&name) || !is_accepted_content_type(file.content_type.as_deref())
            {
                return Err(IntakeError::NotPdf { name });
            }
            if file.size() > self.limits.max_file_size_bytes {
                return Err(IntakeError::FileTooLarge {
                    name,
                    size: file.size(),
                    max: self.limits.max_file_size_bytes,
                });
            }
        }
        Ok(())
    }

    async fn write_one(&self, file: UploadedFile) -> Result<StagedFile, IntakeError> {
        let original_name = display_name(&file.name);
        let file_id = uuid::Uuid::new_v4().simple().to_string();
        let staged_at = Utc::now();

        let mut safe = secure_filename(&original_name);
        if safe.is_empty() {
            safe = "upload.pdf".to_string();
        }
        let staged_name = format!(
            "{}_{}_{}",
            staged_at.format("%Y%m%d_%H%M%S"),
            &file_id[..8],
            safe
        );
        let path = self.dir.join(staged_name);

        tokio::fs::write(&path, &file.bytes).await?;
        debug!(file_id = %file_id, path = %path.display(), size = file.size(), "Staged file");

        Ok(StagedFile {
            file_id,
            original_name,
            path,
            size_bytes: file.size(),
            staged_at,
        })
    }

    /// Resolves and consumes staged handles, in the given order.
    ///
    /// Either every handle is consumed or none is.
    pub fn take(&self, file_ids: &[String]) -> Result<Vec<FileDescriptor>, IntakeError> {
        Ok(self
            .take_staged(file_ids)?
            .into_iter()
            .map(|staged| FileDescriptor::new(staged.original_name, staged.path))
            .collect())
    }

    /// Like [`take`](Self::take), but hands back the staged entries so a
    /// failed submission can [`restore`](Self::restore) them.
    pub fn take_staged(&self, file_ids: &[String]) -> Result<Vec<StagedFile>, IntakeError> {
        if file_ids.is_empty() {
            return Err(IntakeError::NoFiles);
        }
        if file_ids.len() > self.limits.max_batch_size {
            return Err(IntakeError::TooManyFiles {
                count: file_ids.len(),
                max: self.limits.max_batch_size,
            });
        }

        let mut registry = self.registry.lock().map_err(|_| IntakeError::Internal)?;

        let mut seen = HashSet::new();
        for file_id in file_ids {
            if !registry.contains_key(file_id) || !seen.insert(file_id.as_str()) {
                return Err(IntakeError::UnknownFile {
                    file_id: file_id.clone(),
                });
            }
        }

        Ok(file_ids
            .iter()
            .filter_map(|id| registry.remove(id))
            .collect())
    }

    /// Re-registers handles consumed by a submission that did not go through.
    pub fn restore(&self, files: Vec<StagedFile>) {
        match self.registry.lock() {
            Ok(mut registry) => {
                for staged in files {
                    registry.insert(staged.file_id.clone(), staged);
                }
            }
            Err(_) => warn!(count = files.len(), "Staging registry poisoned, handles not restored"),
        }
    }

    /// Number of staged files awaiting submission.
    pub fn pending(&self) -> usize {
        self.registry.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Deletes staged files of a removed job.
    pub async fn discard<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> usize {
        let mut removed = 0;
        for path in paths {
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged file"),
            }
        }
        removed
    }

    /// Removes uploads staged before `cutoff`.
    ///
    /// Unsubmitted handles older than the cutoff are dropped. Files in the
    /// staging directory that nothing tracks are deleted too, unless they
    /// appear in `referenced` (sources of jobs still in the store).
    pub async fn sweep_stale(
        &self,
        cutoff: DateTime<Utc>,
        referenced: &HashSet<PathBuf>,
    ) -> Result<usize, IntakeError> {
        let (expired, tracked): (Vec<PathBuf>, HashSet<PathBuf>) = {
            let mut registry = self.registry.lock().map_err(|_| IntakeError::Internal)?;
            let expired_ids: Vec<String> = registry
                .values()
                .filter(|f| f.staged_at < cutoff)
                .map(|f| f.file_id.clone())
                .collect();
            let expired = expired_ids
                .iter()
                .filter_map(|id| registry.remove(id))
                .map(|f| f.path)
                .collect();
            let tracked = registry.values().map(|f| f.path.clone()).collect();
            (expired, tracked)
        };

        let mut removed = self.discard(expired.iter().map(PathBuf::as_path)).await;

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
            Err(e) => return Err(e.into()),
        };

        let cutoff_time: SystemTime = cutoff.into();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if tracked.contains(&path) || referenced.contains(&path) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let modified = metadata.modified().unwrap_or(SystemTime::now());
            if modified < cutoff_time {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        debug!(path = %path.display(), "Removed stale upload");
                        removed += 1;
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale upload"),
                }
            }
        }

        Ok(removed)
    }
}

fn is_accepted_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.is_empty() || ACCEPTED_CONTENT_TYPES.contains(&essence.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pdf(name: &str) -> UploadedFile {
        UploadedFile::new(name, Some("application/pdf"), b"%PDF-1.4 test".to_vec())
    }

    fn area(dir: &TempDir) -> StagingArea {
        StagingArea::new(
            dir.path().join("uploads"),
            IntakeLimits {
                max_batch_size: 5,
                max_file_size_bytes: 64,
            },
        )
    }

    async fn staged_count(area: &StagingArea) -> usize {
        match std::fs::read_dir(area.dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    #[tokio::test]
    async fn test_stage_batch_writes_files() {
        let dir = TempDir::new().unwrap();
        let area = area(&dir);

        let staged = area
            .stage_batch(vec![pdf("My Report.pdf"), pdf("b.PDF")])
            .await
            .unwrap();

        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].original_name, "My Report.pdf");
        assert!(staged[0].path.exists());
        assert!(staged[0]
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_My_Report.pdf"));
        assert_eq!(staged[1].size_bytes, 13);
        assert_eq!(area.pending(), 2);
    }

    #[tokio::test]
    async fn test_rejects_whole_batch_before_writing() {
        let dir = TempDir::new().unwrap();
        let area = area(&dir);

        let err = area
            .stage_batch(vec![pdf("a.pdf"), pdf("notes.txt")])
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::NotPdf { ref name } if name == "notes.txt"));
        assert!(err.is_validation());
        assert_eq!(staged_count(&area).await, 0);
        assert_eq!(area.pending(), 0);
    }

    #[tokio::test]
    async fn test_rejects_wrong_content_type() {
        let dir = TempDir::new().unwrap();
        let area = area(&dir);

        let file = UploadedFile::new("a.pdf", Some("image/png"), b"%PDF-".to_vec());
        let err = area.stage_batch(vec![file]).await.unwrap_err();
        assert!(matches!(err, IntakeError::NotPdf { .. }));
    }

    #[tokio::test]
    async fn test_accepts_generic_content_types() {
        let dir = TempDir::new().unwrap();
        let area = area(&dir);

        let files = vec![
            UploadedFile::new("a.pdf", None, b"%PDF-".to_vec()),
            UploadedFile::new("b.pdf", Some("application/octet-stream"), b"%PDF-".to_vec()),
            UploadedFile::new("c.pdf", Some("Application/PDF; charset=binary"), b"%PDF-".to_vec()),
        ];
        assert_eq!(area.stage_batch(files).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_batch_limits() {
        let dir = TempDir::new().unwrap();
        let area = area(&dir);

        let too_many: Vec<_> = (0..6).map(|i| pdf(&format!("{}.pdf", i))).collect();
        assert!(matches!(
            area.stage_batch(too_many).await,
            Err(IntakeError::TooManyFiles { count: 6, max: 5 })
        ));

        assert!(matches!(
            area.stage_batch(vec![]).await,
            Err(IntakeError::NoFiles)
        ));

        // empty names are skipped, leaving nothing
        assert!(matches!(
            area.stage_batch(vec![pdf("")]).await,
            Err(IntakeError::NoFiles)
        ));

        let big = UploadedFile::new("big.pdf", None, vec![0u8; 65]);
        assert!(matches!(
            area.stage_batch(vec![big]).await,
            Err(IntakeError::FileTooLarge { size: 65, max: 64, .. })
        ));
        assert_eq!(staged_count(&area).await, 0);
    }

    #[tokio::test]
    async fn test_take_consumes_handles() {
        let dir = TempDir::new().unwrap();
        let area = area(&dir);
        let staged = area.stage_batch(vec![pdf("a.pdf"), pdf("b.pdf")]).await.unwrap();

        let ids = vec![staged[1].file_id.clone(), staged[0].file_id.clone()];
        let files = area.take(&ids).unwrap();
        assert_eq!(files[0].original_name, "b.pdf");
        assert_eq!(files[1].original_name, "a.pdf");
        assert_eq!(files[1].source_path, staged[0].path);

        assert!(matches!(area.take(&ids), Err(IntakeError::UnknownFile { .. })));
    }

    #[tokio::test]
    async fn test_take_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let area = area(&dir);
        let staged = area.stage_batch(vec![pdf("a.pdf")]).await.unwrap();

        let ids = vec![staged[0].file_id.clone(), "missing".to_string()];
        assert!(matches!(area.take(&ids), Err(IntakeError::UnknownFile { ref file_id }) if file_id == "missing"));

        // duplicate handles are rejected
        let dup = vec![staged[0].file_id.clone(), staged[0].file_id.clone()];
        assert!(area.take(&dup).is_err());

        assert_eq!(area.pending(), 1);
        assert!(area.take(&[staged[0].file_id.clone()]).is_ok());
    }

    #[tokio::test]
    async fn test_restore_returns_handles() {
        let dir = TempDir::new().unwrap();
        let area = area(&dir);
        let staged = area
            .stage_batch(vec![pdf("a.pdf"), pdf("b.pdf")])
            .await
            .unwrap();
        let ids: Vec<String> = staged.iter().map(|s| s.file_id.clone()).collect();

        let taken = area.take_staged(&ids).unwrap();
        assert_eq!(area.pending(), 0);

        area.restore(taken);
        assert_eq!(area.pending(), 2);

        let files = area.take(&ids).unwrap();
        assert_eq!(files[0].original_name, "a.pdf");
        assert_eq!(files[1].original_name, "b.pdf");
    }

    #[tokio::test]
    async fn test_sweep_stale() {
        let dir = TempDir::new().unwrap();
        let area = area(&dir);
        let staged = area
            .stage_batch(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")])
            .await
            .unwrap();

        // b belongs to a job, c is an orphan referenced by one
        let taken = area.take(&[staged[1].file_id.clone()]).unwrap();
        let referenced: HashSet<PathBuf> = taken.iter().map(|f| f.source_path.clone()).collect();
        let orphan = area.dir().join("orphan.pdf");
        std::fs::write(&orphan, b"%PDF-").unwrap();

        // nothing is older than a cutoff in the past
        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(area.sweep_stale(past, &referenced).await.unwrap(), 0);

        let future = Utc::now() + chrono::Duration::hours(1);
        let removed = area.sweep_stale(future, &referenced).await.unwrap();
        assert_eq!(removed, 3);
        assert!(!staged[0].path.exists());
        assert!(staged[1].path.exists());
        assert!(!orphan.exists());
        assert_eq!(area.pending(), 0);
    }

    #[test]
    fn test_content_type_matching() {
        assert!(is_accepted_content_type(None));
        assert!(is_accepted_content_type(Some("")));
        assert!(is_accepted_content_type(Some("application/pdf")));
        assert!(!is_accepted_content_type(Some("text/plain")));
    }
}
