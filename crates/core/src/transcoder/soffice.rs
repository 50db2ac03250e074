//! LibreOffice-based transcoder implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::config::TranscoderConfig;
use super::error::TranscoderError;
use super::traits::Transcoder;
use super::types::{TranscodeRequest, TranscodeResult, DOCX_EXTENSION, PDF_MAGIC};

/// Export filter used for `--convert-to`.
const DOCX_FILTER: &str = "docx:MS Word 2007 XML";

/// Import filter that opens PDFs in Writer instead of Draw.
const PDF_IMPORT_FILTER: &str = "writer_pdf_import";

/// Per-run directories, removed when the run ends or its future is dropped.
struct ScratchDirs {
    work_dir: PathBuf,
    profile_dir: PathBuf,
}

impl Drop for ScratchDirs {
    fn drop(&mut self) {
        for dir in [&self.work_dir, &self.profile_dir] {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %dir.display(), error = %e, "Failed to remove scratch directory"),
            }
        }
    }
}

/// Transcoder that shells out to `soffice --headless --convert-to docx`.
pub struct SofficeTranscoder {
    config: TranscoderConfig,
}

impl SofficeTranscoder {
    /// Creates a new transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds soffice arguments for one conversion.
    ///
    /// Every call gets its own user profile so several conversions can run
    /// side by side without fighting over the profile lock.
    fn build_args(&self, input_path: &Path, out_dir: &Path, profile_dir: &Path) -> Vec<String> {
        let mut args = vec![
            format!("-env:UserInstallation={}", file_url(profile_dir)),
            "--headless".to_string(),
            "--norestore".to_string(),
            "--nolockcheck".to_string(),
            format!("--infilter={}", PDF_IMPORT_FILTER),
            "--convert-to".to_string(),
            DOCX_FILTER.to_string(),
            "--outdir".to_string(),
            out_dir.to_string_lossy().to_string(),
        ];

        args.extend(self.config.extra_args.iter().cloned());
        args.push(input_path.to_string_lossy().to_string());

        args
    }

    /// Rejects inputs that do not start with the PDF signature.
    async fn check_pdf_header(path: &Path) -> Result<(), TranscoderError> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut header = [0u8; 5];
        let mut read = 0;
        while read < header.len() {
            let n = file.read(&mut header[read..]).await?;
            if n == 0 {
                break;
            }
            read += n;
        }

        if &header[..read] != PDF_MAGIC {
            return Err(TranscoderError::unsupported("missing PDF signature"));
        }
        Ok(())
    }

    /// Runs soffice inside `work_dir` and moves the result into place.
    async fn run_conversion(
        &self,
        request: &TranscodeRequest,
        work_dir: &Path,
        profile_dir: &Path,
    ) -> Result<u64, TranscoderError> {
        tokio::fs::create_dir_all(work_dir).await?;

        let args = self.build_args(&request.input_path, work_dir, profile_dir);
        debug!(job_id = %request.job_id, program = ?self.config.program, "Running converter");

        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscoderError::ProgramNotFound {
                        path: self.config.program.clone(),
                    }
                } else {
                    TranscoderError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TranscoderError::conversion_failed(
                format!("converter exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        // soffice names its output after the input stem, and exits 0 even
        // when it could not load the document.
        let stem = request
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let produced = work_dir.join(format!("{}.{}", stem, DOCX_EXTENSION));
        if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
            return Err(TranscoderError::OutputMissing { path: produced });
        }

        tokio::fs::rename(&produced, &request.output_path).await?;
        let meta = tokio::fs::metadata(&request.output_path).await?;
        Ok(meta.len())
    }
}

#[async_trait]
impl Transcoder for SofficeTranscoder {
    fn name(&self) -> &str {
        "soffice"
    }

    async fn transcode(
        &self,
        request: TranscodeRequest,
    ) -> Result<TranscodeResult, TranscoderError> {
        let start = Instant::now();

        if !tokio::fs::try_exists(&request.input_path).await? {
            return Err(TranscoderError::InputNotFound {
                path: request.input_path.clone(),
            });
        }
        Self::check_pdf_header(&request.input_path).await?;

        let out_parent = request
            .output_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&out_parent).await?;

        // Work dir sits next to the final output so the final move is a rename.
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let scratch = ScratchDirs {
            work_dir: out_parent.join(format!(".work-{}", run_id)),
            profile_dir: self.config.scratch_dir.join(format!("profile-{}", run_id)),
        };

        let result = self
            .run_conversion(&request, &scratch.work_dir, &scratch.profile_dir)
            .await;
        drop(scratch);

        let output_size_bytes = result?;
        Ok(TranscodeResult {
            output_path: request.output_path,
            output_size_bytes,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        let output = Command::new(&self.config.program)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscoderError::ProgramNotFound {
                        path: self.config.program.clone(),
                    }
                } else {
                    TranscoderError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TranscoderError::conversion_failed(
                "converter --version failed",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        debug!(
            "Converter available: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }
}

/// `file://` URL for a local directory, as soffice expects for profiles.
fn file_url(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let raw = absolute.to_string_lossy().replace('\\', "/");
    let encoded = raw
        .split('/')
        .enumerate()
        .map(|(idx, segment)| {
            // keep a Windows drive letter ("C:") as is
            if idx == 0 && segment.len() == 2 && segment.ends_with(':') {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    if encoded.starts_with('/') {
        format!("file://{}", encoded)
    } else {
        format!("file:///{}", encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request_in(dir: &TempDir, input: &str) -> TranscodeRequest {
        TranscodeRequest {
            job_id: "job-1".to_string(),
            input_path: dir.path().join(input),
            output_path: dir.path().join("out").join("report.docx"),
        }
    }

    #[test]
    fn test_build_args() {
        let transcoder = SofficeTranscoder::new(TranscoderConfig {
            extra_args: vec!["--nologo".to_string()],
            ..Default::default()
        });
        let args = transcoder.build_args(
            Path::new("/staging/in.pdf"),
            Path::new("/out/.work"),
            Path::new("/tmp/profile"),
        );

        assert_eq!(args[0], "-env:UserInstallation=file:///tmp/profile");
        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--infilter=writer_pdf_import".to_string()));
        let convert_pos = args.iter().position(|a| a == "--convert-to").unwrap();
        assert_eq!(args[convert_pos + 1], "docx:MS Word 2007 XML");
        let outdir_pos = args.iter().position(|a| a == "--outdir").unwrap();
        assert_eq!(args[outdir_pos + 1], "/out/.work");
        assert_eq!(args[args.len() - 2], "--nologo");
        assert_eq!(args.last().unwrap(), "/staging/in.pdf");
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let transcoder = SofficeTranscoder::with_defaults();
        let err = transcoder
            .transcode(request_in(&dir, "absent.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscoderError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_rejects_non_pdf_content() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fake.pdf"), b"PK\x03\x04 not a pdf").unwrap();

        let transcoder = SofficeTranscoder::with_defaults();
        let err = transcoder
            .transcode(request_in(&dir, "fake.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscoderError::UnsupportedInput { .. }));
    }

    #[tokio::test]
    async fn test_rejects_truncated_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("short.pdf"), b"%P").unwrap();

        let transcoder = SofficeTranscoder::with_defaults();
        let err = transcoder
            .transcode(request_in(&dir, "short.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscoderError::UnsupportedInput { .. }));
    }

    #[tokio::test]
    async fn test_program_not_found() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"%PDF-1.7\n%%EOF\n").unwrap();

        let transcoder = SofficeTranscoder::new(
            TranscoderConfig::with_program(PathBuf::from("/nonexistent/soffice"))
                .with_scratch_dir(dir.path().join("scratch")),
        );
        let err = transcoder
            .transcode(request_in(&dir, "doc.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscoderError::ProgramNotFound { .. }));

        // Work directory is cleaned up on failure.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("out"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_validate_missing_program() {
        let transcoder = SofficeTranscoder::new(TranscoderConfig::with_program(PathBuf::from(
            "/nonexistent/soffice",
        )));
        let err = transcoder.validate().await.unwrap_err();
        assert!(matches!(err, TranscoderError::ProgramNotFound { .. }));
    }

    #[test]
    fn test_file_url_absolute() {
        assert_eq!(file_url(Path::new("/var/tmp/p")), "file:///var/tmp/p");
    }

    #[test]
    fn test_file_url_encodes_segments() {
        assert_eq!(
            file_url(Path::new("/var/my scratch/100%/profile-1")),
            "file:///var/my%20scratch/100%25/profile-1"
        );
    }

    /// Writes a stand-in converter that creates its profile dir, then hangs.
    #[cfg(unix)]
    fn hanging_converter(dir: &Path) -> PathBuf {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-soffice");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            br#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    -env:UserInstallation=file://*) mkdir -p "${arg#-env:UserInstallation=file://}" ;;
  esac
done
sleep 30
"#,
        )
        .unwrap();
        file.sync_all().unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timed_out_conversion_removes_scratch_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"%PDF-1.7\n%%EOF\n").unwrap();
        let scratch_dir = dir.path().join("scratch");

        let transcoder = SofficeTranscoder::new(
            TranscoderConfig::with_program(hanging_converter(dir.path()))
                .with_scratch_dir(scratch_dir.clone()),
        );
        let request = request_in(&dir, "doc.pdf");

        // the converter is still running when the run is abandoned
        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            transcoder.transcode(request),
        )
        .await;
        assert!(outcome.is_err());

        let out_entries: Vec<_> = std::fs::read_dir(dir.path().join("out"))
            .unwrap()
            .collect();
        assert!(out_entries.is_empty());
        let scratch_entries: Vec<_> = std::fs::read_dir(&scratch_dir)
            .map(|entries| entries.collect())
            .unwrap_or_default();
        assert!(scratch_entries.is_empty());
    }
}
