//! Trait definitions for the transcoder module.

use async_trait::async_trait;

use super::error::TranscoderError;
use super::types::{TranscodeRequest, TranscodeResult, DOCX_EXTENSION};

/// Converts one source document into one Word document.
///
/// Implementations must be cancel-safe: the caller may drop the returned
/// future when its time budget runs out.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Converts `request.input_path` into `request.output_path`.
    async fn transcode(&self, request: TranscodeRequest)
        -> Result<TranscodeResult, TranscoderError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscoderError>;

    /// Extension of the produced documents.
    fn output_extension(&self) -> &str {
        DOCX_EXTENSION
    }
}
