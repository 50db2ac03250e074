use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use super::{downloads, handlers, jobs, middleware::metrics_middleware, upload, ws};
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = upload_body_limit(&state);
    let static_dir = state.config().server.static_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Intake
        .route(
            "/upload",
            post(upload::upload_files)
                .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(upload_limit)),
        )
        // Jobs
        .route("/convert", post(jobs::start_conversion))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{job_id}", get(jobs::get_job))
        .route("/jobs/{job_id}/cancel", post(jobs::cancel_job))
        .route("/jobs/{job_id}/events", get(ws::job_events))
        .route(
            "/jobs/{job_id}/files/{output_name}",
            get(downloads::download_file),
        )
        // Housekeeping
        .route("/cleanup", post(handlers::cleanup))
        .with_state(state.clone());

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics_handler).with_state(state));

    // Serve a front-end bundle with SPA fallback when configured
    let router = match static_dir {
        Some(dir) => {
            let index_path = dir.join("index.html");
            router.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index_path)))
        }
        None => router,
    };

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn upload_body_limit(state: &AppState) -> usize {
    let limits = &state.config().limits;
    let per_file = usize::try_from(limits.max_file_size_bytes).unwrap_or(usize::MAX);
    per_file
        .saturating_mul(limits.max_batch_size)
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}
