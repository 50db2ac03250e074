//! Upload API handler.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use pdfword_core::{StagedFile, UploadedFile};

use super::error::ApiError;
use crate::metrics::{UPLOADED_BYTES_TOTAL, UPLOADED_FILES_TOTAL};
use crate::state::AppState;

/// Multipart field names carrying files.
const FILE_FIELDS: &[&str] = &["files[]", "files"];

/// Response for a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub files: Vec<StagedFile>,
    pub message: String,
}

/// Stage the PDF files of a multipart upload.
///
/// The batch is accepted or rejected as a whole.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(ApiError::new(e.status(), e.body_text())),
        };

        let field_name = field.name().unwrap_or("").to_string();
        if !FILE_FIELDS.contains(&field_name.as_str()) {
            debug!("Ignoring multipart field {:?}", field_name);
            continue;
        }

        let name = field.file_name().unwrap_or("").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;

        files.push(UploadedFile {
            name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let staged = state.staging().stage_batch(files).await?;

    let total_bytes: u64 = staged.iter().map(|f| f.size_bytes).sum();
    UPLOADED_FILES_TOTAL.inc_by(staged.len() as u64);
    UPLOADED_BYTES_TOTAL.inc_by(total_bytes);
    info!(files = staged.len(), bytes = total_bytes, "Upload accepted");

    Ok(Json(UploadResponse {
        success: true,
        message: format!("{} file(s) uploaded successfully", staged.len()),
        files: staged,
    }))
}
