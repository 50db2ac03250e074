//! Testing utilities and mock implementations.
//!
//! Lets the orchestrator and the HTTP layer be exercised end to end without
//! a LibreOffice installation.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfword_core::testing::{MockFailure, MockTranscoder};
//!
//! let transcoder = MockTranscoder::new().with_failure_for("B.pdf", MockFailure::Corrupt);
//! // Use in AppState...
//! ```

mod mock_transcoder;

pub use mock_transcoder::{MockFailure, MockTranscoder, RecordedTranscode, MOCK_DOCX_BYTES};

/// Test fixtures and helper functions.
pub mod fixtures {
    /// Minimal bytes that pass a PDF header check.
    pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n%mock\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF\n";

    /// Stage `names` as PDF files in `dir` and return their descriptors.
    pub fn staged_pdfs(dir: &std::path::Path, names: &[&str]) -> Vec<crate::job::FileDescriptor> {
        std::fs::create_dir_all(dir).ok();
        names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let path = dir.join(format!("{:02}_{}", idx, name));
                std::fs::write(&path, PDF_BYTES).ok();
                crate::job::FileDescriptor::new(*name, path)
            })
            .collect()
    }
}
