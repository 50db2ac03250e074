//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extension of every produced document.
pub const DOCX_EXTENSION: &str = "docx";

/// MIME type of produced documents.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// A single document to transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    /// Job this document belongs to (for logging).
    pub job_id: String,
    /// Staged source document.
    pub input_path: PathBuf,
    /// Where the DOCX must be written.
    pub output_path: PathBuf,
}

/// Result of a successful transcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeResult {
    /// Path of the produced document.
    pub output_path: PathBuf,
    /// Size of the produced document in bytes.
    pub output_size_bytes: u64,
    /// Wall-clock time spent in milliseconds.
    pub duration_ms: u64,
}
