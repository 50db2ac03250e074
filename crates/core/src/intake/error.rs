//! Error types for upload intake.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("No valid files uploaded")]
    NoFiles,

    #[error("Maximum {max} files allowed, got {count}")]
    TooManyFiles { count: usize, max: usize },

    #[error("{name} is not a PDF file")]
    NotPdf { name: String },

    #[error("{name} is too large ({size} bytes, limit {max} bytes)")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("Unknown file id: {file_id}")]
    UnknownFile { file_id: String },

    #[error("Staging I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Staging registry unavailable")]
    Internal,
}

impl IntakeError {
    /// Whether the error is caused by the client's input.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Internal)
    }
}
