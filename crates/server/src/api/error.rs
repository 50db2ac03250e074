//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use pdfword_core::{ArtifactError, HousekeepingError, IntakeError, JobError, OrchestratorError};

use crate::metrics::REJECTED_REQUESTS_TOTAL;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by API handlers.
///
/// Internal errors are logged and reported with a generic message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        let reason = match &err {
            IntakeError::NoFiles => "no_files",
            IntakeError::TooManyFiles { .. } => "too_many_files",
            IntakeError::NotPdf { .. } => "not_pdf",
            IntakeError::FileTooLarge { .. } => "file_too_large",
            IntakeError::UnknownFile { .. } => "unknown_file",
            IntakeError::Io(_) | IntakeError::Internal => {
                return Self::internal("Staging failed", err)
            }
        };
        REJECTED_REQUESTS_TOTAL.with_label_values(&[reason]).inc();
        Self::bad_request(err.to_string())
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Validation(msg) => {
                REJECTED_REQUESTS_TOTAL.with_label_values(&["invalid_batch"]).inc();
                Self::bad_request(msg)
            }
            JobError::NotFound(id) => Self::not_found(format!("Job not found: {}", id)),
            err @ JobError::InvalidState { .. } => Self::conflict(err.to_string()),
            err @ JobError::Internal(_) => Self::internal("Job store error", err),
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Job(e) => e.into(),
            err @ OrchestratorError::AlreadyRunning(_) => Self::conflict(err.to_string()),
            OrchestratorError::ShuttingDown => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Server is shutting down",
            ),
            err @ OrchestratorError::Internal(_) => Self::internal("Orchestrator error", err),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::NotFound { .. } => Self::not_found("File not found"),
            err => Self::internal("Artifact lookup failed", err),
        }
    }
}

impl From<HousekeepingError> for ApiError {
    fn from(err: HousekeepingError) -> Self {
        Self::internal("Cleanup failed", err)
    }
}
