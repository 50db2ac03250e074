//! Configuration for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the LibreOffice-based transcoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Path to the soffice/libreoffice binary.
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Additional arguments passed before the input file.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Time budget for converting a single document, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Scratch directory for per-conversion profiles and work files.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
}

fn default_program() -> PathBuf {
    PathBuf::from("soffice")
}

fn default_timeout() -> u64 {
    120
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("pdfword-transcoder")
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            extra_args: Vec::new(),
            timeout_secs: default_timeout(),
            scratch_dir: default_scratch_dir(),
        }
    }
}

impl TranscoderConfig {
    /// Creates a new config with a custom program path.
    pub fn with_program(program: PathBuf) -> Self {
        Self {
            program,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the scratch directory.
    pub fn with_scratch_dir(mut self, scratch_dir: PathBuf) -> Self {
        self.scratch_dir = scratch_dir;
        self
    }
}
