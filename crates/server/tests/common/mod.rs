//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! backed by a mock transcoder and temporary storage directories, so the
//! whole HTTP surface can be exercised without LibreOffice.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use pdfword_core::testing::MockTranscoder;
use pdfword_core::{Config, LimitsConfig, StorageConfig};
use pdfword_server::state::AppState;

/// Re-export fixtures for test convenience
pub use pdfword_core::testing::fixtures;

const BOUNDARY: &str = "----pdfword-test-boundary";

/// Test fixture for E2E testing with a mock transcoder.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.upload(&[("A.pdf", fixtures::PDF_BYTES)]).await;
///     assert_eq!(response.status, StatusCode::OK);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state behind the router
    pub state: Arc<AppState>,
    /// Mock transcoder - script failures and delays
    pub transcoder: Arc<MockTranscoder>,
    /// Temporary directory holding uploads and outputs
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Raw response, for downloads
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    /// Create a new test fixture with a transcoder that always succeeds.
    pub async fn new() -> Self {
        Self::with_transcoder(MockTranscoder::new()).await
    }

    /// Create a test fixture around a scripted transcoder.
    pub async fn with_transcoder(transcoder: MockTranscoder) -> Self {
        Self::with_config(transcoder, TestConfig::default()).await
    }

    /// Create a test fixture with custom limits.
    pub async fn with_config(transcoder: MockTranscoder, test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let config = Config {
            storage: StorageConfig {
                upload_dir: temp_dir.path().join("uploads"),
                output_dir: temp_dir.path().join("outputs"),
                retention_secs: test_config.retention_secs,
                cleanup_interval_secs: 0,
            },
            limits: LimitsConfig {
                max_file_size_bytes: test_config.max_file_size_bytes,
                ..Default::default()
            },
            ..Default::default()
        };

        let transcoder = Arc::new(transcoder);
        let state = Arc::new(AppState::new(config, transcoder.clone()));
        let router = pdfword_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            transcoder,
            temp_dir,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.temp_dir.path().join("uploads")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp_dir.path().join("outputs")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Upload `files` as a multipart `files[]` batch.
    pub async fn upload(&self, files: &[(&str, &[u8])]) -> TestResponse {
        let parts: Vec<(&str, &str, &[u8])> = files
            .iter()
            .map(|(name, bytes)| (*name, "application/pdf", *bytes))
            .collect();
        self.upload_parts(&parts).await
    }

    /// Upload parts of `(file name, content type, bytes)`.
    pub async fn upload_parts(&self, parts: &[(&str, &str, &[u8])]) -> TestResponse {
        let mut body = Vec::new();
        for (name, content_type, bytes) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files[]\"; filename=\"{}\"\r\n",
                    name
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let raw = self.send(request).await;
        TestResponse {
            status: raw.status,
            body: parse_json(&raw.bytes),
        }
    }

    /// Upload `files`, submit them, and return the job id.
    pub async fn convert(&self, files: &[(&str, &[u8])]) -> String {
        let upload = self.upload(files).await;
        assert_eq!(upload.status, StatusCode::OK, "upload failed: {}", upload.body);
        let file_ids: Vec<Value> = upload.body["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["file_id"].clone())
            .collect();

        let response = self
            .post("/api/v1/convert", json!({ "file_ids": file_ids }))
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED, "convert failed: {}", response.body);
        response.body["job_id"].as_str().unwrap().to_string()
    }

    /// Poll the job until it is completed and return its view.
    pub async fn wait_for_completion(&self, job_id: &str) -> Value {
        let path = format!("/api/v1/jobs/{}", job_id);
        for _ in 0..200 {
            let response = self.get(&path).await;
            if response.body["status"] == "completed" {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {} did not complete in time", job_id);
    }

    /// Fetch a path without decoding the body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        let raw = self.send(request).await;
        TestResponse {
            status: raw.status,
            body: parse_json(&raw.bytes),
        }
    }

    async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawResponse {
            status,
            headers,
            bytes,
        }
    }
}

fn parse_json(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub max_file_size_bytes: u64,
    pub retention_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 1024 * 1024,
            retention_secs: 3600,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
