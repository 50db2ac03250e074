//! Error types for the transcoder module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while transcoding one document.
#[derive(Debug, Error)]
pub enum TranscoderError {
    /// Converter binary not found.
    #[error("Converter program not found at path: {path}")]
    ProgramNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Input is not a readable PDF document.
    #[error("Unsupported input: {reason}")]
    UnsupportedInput { reason: String },

    /// Converter process failed.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Converter exited cleanly but did not produce the expected output.
    #[error("Converter produced no output at: {path}")]
    OutputMissing { path: PathBuf },

    /// Conversion exceeded its time budget.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscoderError {
    /// Creates a new conversion failed error with stderr output.
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new unsupported input error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedInput {
            reason: reason.into(),
        }
    }

    /// Short reason suitable for showing to the user.
    ///
    /// Never includes paths or converter output.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::UnsupportedInput { .. } => "unsupported or corrupt document",
            Self::InputNotFound { .. } => "source file missing",
            Self::ProgramNotFound { .. } => "converter unavailable",
            Self::OutputMissing { .. } => "converter produced no output",
            Self::ConversionFailed { .. } | Self::Io(_) => "conversion failed",
        }
    }
}
