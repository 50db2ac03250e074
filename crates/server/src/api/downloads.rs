//! Converted file downloads.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use pdfword_core::Artifact;

use super::error::ApiError;
use crate::state::AppState;

/// Stream a converted document of a completed job as an attachment.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path((job_id, output_name)): Path<(String, String)>,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let artifact = state.artifacts().resolve(&job_id, &output_name).await?;
    debug!(job_id = %job_id, file = %artifact.file_name, size = artifact.size_bytes, "Serving converted file");

    let response = ServeFile::new(&artifact.path)
        .oneshot(request)
        .await
        .map_err(|e| ApiError::internal("Failed to serve file", e))?;

    let mut response = response.map(Body::new).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.content_type),
    );
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&artifact)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name.
fn content_disposition(artifact: &Artifact) -> String {
    let fallback: String = artifact
        .file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(&artifact.file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn artifact(name: &str) -> Artifact {
        Artifact {
            job_id: "job-1".to_string(),
            file_name: name.to_string(),
            source_name: "x.pdf".to_string(),
            path: PathBuf::from("/outputs/job-1").join(name),
            size_bytes: 1,
            content_type: pdfword_core::transcoder::DOCX_CONTENT_TYPE,
        }
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition(&artifact("report.docx")),
            "attachment; filename=\"report.docx\"; filename*=UTF-8''report.docx"
        );
        assert_eq!(
            content_disposition(&artifact("a b.docx")),
            "attachment; filename=\"a_b.docx\"; filename*=UTF-8''a%20b.docx"
        );
    }
}
