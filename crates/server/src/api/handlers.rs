use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use pdfword_core::SanitizedConfig;

use super::error::ApiError;
use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub jobs_removed: usize,
    pub uploads_removed: usize,
}

/// Run a housekeeping sweep immediately.
pub async fn cleanup(State(state): State<Arc<AppState>>) -> Result<Json<CleanupResponse>, ApiError> {
    let report = state.housekeeper().sweep().await?;
    info!(
        jobs_removed = report.jobs_removed,
        uploads_removed = report.uploads_removed,
        "Manual cleanup finished"
    );
    Ok(Json(CleanupResponse {
        success: true,
        message: "Cleanup completed".to_string(),
        jobs_removed: report.jobs_removed,
        uploads_removed: report.uploads_removed,
    }))
}

/// Prometheus scrape endpoint.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
