//! Types for upload intake.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use crate::config::{Config, DEFAULT_MAX_FILE_SIZE_BYTES, MAX_BATCH_SIZE};

/// One file of an upload request, as received.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-declared file name (untrusted).
    pub name: String,
    /// Client-declared content type, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A file written to the staging directory and awaiting submission.
#[derive(Debug, Clone, Serialize)]
pub struct StagedFile {
    pub file_id: String,
    pub original_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(skip)]
    pub staged_at: DateTime<Utc>,
}

/// Batch limits enforced at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    pub max_batch_size: usize,
    pub max_file_size_bytes: u64,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

impl From<&Config> for IntakeLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_batch_size: config.limits.max_batch_size,
            max_file_size_bytes: config.limits.max_file_size_bytes,
        }
    }
}
