//! Job API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use pdfword_core::{FileDescriptor, FileOutcome, Job, JobStatus};

use super::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting a conversion
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Handles returned by the upload endpoint, in processing order
    pub file_ids: Vec<String>,
}

/// Response for an accepted conversion
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub job_id: String,
    pub message: String,
}

/// One file of a job
#[derive(Debug, Serialize)]
pub struct FileView {
    pub original_name: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
    /// Download location, once the job is completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Response for job queries
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub total_files: usize,
    pub total_converted: usize,
    pub total_failed: usize,
    pub files: Vec<FileView>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        let completed = job.status == JobStatus::Completed;
        let files = job
            .files
            .iter()
            .map(|task| FileView {
                original_name: task.original_name.clone(),
                download_url: match &task.outcome {
                    FileOutcome::Succeeded { output_name } if completed => {
                        Some(download_url(&job.job_id, output_name))
                    }
                    _ => None,
                },
                outcome: task.outcome.clone(),
            })
            .collect();

        Self {
            total_files: job.total_files(),
            total_converted: job.succeeded(),
            total_failed: job.failed(),
            created_at: job.created_at.to_rfc3339(),
            started_at: job.started_at.map(|t| t.to_rfc3339()),
            completed_at: job.completed_at.map(|t| t.to_rfc3339()),
            status: job.status,
            job_id: job.job_id,
            files,
        }
    }
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub total: usize,
}

/// Response for cancellation
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

fn download_url(job_id: &str, output_name: &str) -> String {
    format!(
        "/api/v1/jobs/{}/files/{}",
        job_id,
        urlencoding::encode(output_name)
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit staged uploads as a new job. Returns before any file is converted.
pub async fn start_conversion(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ConvertResponse>), ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let staged = state.staging().take_staged(&body.file_ids)?;
    let count = staged.len();
    let files = staged
        .iter()
        .map(|s| FileDescriptor::new(s.original_name.clone(), s.path.clone()))
        .collect();
    let job_id = match state.orchestrator().submit(files).await {
        Ok(job_id) => job_id,
        Err(e) => {
            state.staging().restore(staged);
            return Err(e.into());
        }
    };

    info!(job_id = %job_id, files = count, "Conversion job submitted");
    Ok((
        StatusCode::ACCEPTED,
        Json(ConvertResponse {
            success: true,
            job_id,
            message: "Conversion started".to_string(),
        }),
    ))
}

/// List all jobs, oldest first
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let jobs: Vec<JobResponse> = state
        .job_store()
        .list()?
        .into_iter()
        .map(JobResponse::from)
        .collect();
    Ok(Json(ListJobsResponse {
        total: jobs.len(),
        jobs,
    }))
}

/// Get a job by id
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.job_store().get(&job_id)?;
    Ok(Json(job.into()))
}

/// Ask a running job to stop before its next file
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<(StatusCode, Json<CancelResponse>), ApiError> {
    let job = state.job_store().get(&job_id)?;
    if job.status.is_terminal() || !state.orchestrator().cancel(&job_id).await {
        return Err(ApiError::conflict(format!(
            "Job {} is not running (status: {})",
            job_id, job.status
        )));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            success: true,
            message: "Cancellation requested".to_string(),
        }),
    ))
}
