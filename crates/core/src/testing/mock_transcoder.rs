//! Mock transcoder for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::transcoder::{TranscodeRequest, TranscodeResult, Transcoder, TranscoderError};

/// Bytes written as the "converted" document.
pub const MOCK_DOCX_BYTES: &[u8] = b"PK\x03\x04mock-docx";

/// Failure a mock conversion should report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Input rejected as not a readable PDF.
    Corrupt,
    /// Converter process exited with an error.
    Crash,
    /// Converter exceeded its own time budget.
    Timeout,
}

impl MockFailure {
    fn to_error(self) -> TranscoderError {
        match self {
            MockFailure::Corrupt => TranscoderError::unsupported("mock: corrupt document"),
            MockFailure::Crash => {
                TranscoderError::conversion_failed("mock: exit code 1", Some("boom".to_string()))
            }
            MockFailure::Timeout => TranscoderError::Timeout { timeout_secs: 0 },
        }
    }
}

/// A recorded transcode call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedTranscode {
    /// The request that was submitted.
    pub request: TranscodeRequest,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Transcoder trait.
///
/// Scripted per file: a request matches a rule when its input file name ends
/// with the rule's name, so rules keyed by the upload name also match staged
/// files (`<timestamp>_<id>_<name>`).
///
/// # Example
///
/// ```rust,ignore
/// use pdfword_core::testing::{MockFailure, MockTranscoder};
///
/// let transcoder = MockTranscoder::new()
///     .with_failure_for("B.pdf", MockFailure::Corrupt)
///     .with_delay_for("slow.pdf", Duration::from_secs(5));
/// ```
#[derive(Debug, Default)]
pub struct MockTranscoder {
    failures: HashMap<String, MockFailure>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    unavailable: bool,
    calls: Mutex<Vec<RecordedTranscode>>,
}

impl MockTranscoder {
    /// Create a mock that converts everything successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail files whose name ends with `name`.
    pub fn with_failure_for(mut self, name: impl Into<String>, failure: MockFailure) -> Self {
        self.failures.insert(name.into(), failure);
        self
    }

    /// Delay files whose name ends with `name`.
    pub fn with_delay_for(mut self, name: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(name.into(), delay);
        self
    }

    /// Delay every conversion without a specific rule.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Make `validate` fail.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// All recorded calls, in order.
    pub fn recorded(&self) -> Vec<RecordedTranscode> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Input file names of successful conversions, in order.
    pub fn converted_names(&self) -> Vec<String> {
        self.recorded()
            .into_iter()
            .filter(|c| c.success)
            .map(|c| file_name(&c.request.input_path))
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn lookup<'a, T>(rules: &'a HashMap<String, T>, input: &Path) -> Option<&'a T> {
        let name = file_name(input);
        rules
            .iter()
            .filter(|(rule, _)| name.ends_with(rule.as_str()))
            .max_by_key(|(rule, _)| rule.len())
            .map(|(_, value)| value)
    }

    fn record(&self, request: TranscodeRequest, success: bool) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedTranscode { request, success });
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(
        &self,
        request: TranscodeRequest,
    ) -> Result<TranscodeResult, TranscoderError> {
        let start = Instant::now();

        let delay = Self::lookup(&self.delays, &request.input_path)
            .copied()
            .or(self.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if !request.input_path.exists() {
            let path = request.input_path.clone();
            self.record(request, false);
            return Err(TranscoderError::InputNotFound { path });
        }

        if let Some(failure) = Self::lookup(&self.failures, &request.input_path).copied() {
            self.record(request, false);
            return Err(failure.to_error());
        }

        if let Some(parent) = request.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request.output_path, MOCK_DOCX_BYTES).await?;

        let result = TranscodeResult {
            output_path: request.output_path.clone(),
            output_size_bytes: MOCK_DOCX_BYTES.len() as u64,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        self.record(request, true);
        Ok(result)
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        if self.unavailable {
            return Err(TranscoderError::ProgramNotFound {
                path: "mock".into(),
            });
        }
        Ok(())
    }
}
