//! Document transcoder module.
//!
//! Provides the `Transcoder` trait (one source document in, one DOCX out) and
//! `SofficeTranscoder`, which drives a headless LibreOffice process.
//!
//! # Example
//!
//! ```ignore
//! use pdfword_core::transcoder::{SofficeTranscoder, TranscodeRequest, Transcoder, TranscoderConfig};
//!
//! let transcoder = SofficeTranscoder::new(TranscoderConfig::default());
//! transcoder.validate().await?;
//!
//! let result = transcoder
//!     .transcode(TranscodeRequest {
//!         job_id: "job-1".to_string(),
//!         input_path: PathBuf::from("/staging/report.pdf"),
//!         output_path: PathBuf::from("/outputs/job-1/report.docx"),
//!     })
//!     .await?;
//! println!("Wrote {} bytes in {} ms", result.output_size_bytes, result.duration_ms);
//! ```

mod config;
mod error;
mod soffice;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::TranscoderError;
pub use soffice::SofficeTranscoder;
pub use traits::Transcoder;
pub use types::{TranscodeRequest, TranscodeResult, DOCX_CONTENT_TYPE, DOCX_EXTENSION, PDF_MAGIC};
