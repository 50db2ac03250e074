//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the conversion server:
//! - HTTP request metrics (latency, counts, errors)
//! - WebSocket connection metrics
//! - Upload and job status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pdfword_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfword_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pdfword_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Upload Metrics
// =============================================================================

/// Files accepted by the upload endpoint.
pub static UPLOADED_FILES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("pdfword_uploaded_files_total", "Total files staged by uploads").unwrap()
});

/// Bytes accepted by the upload endpoint.
pub static UPLOADED_BYTES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("pdfword_uploaded_bytes_total", "Total bytes staged by uploads").unwrap()
});

/// Rejected uploads and submissions by reason.
pub static REJECTED_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "pdfword_rejected_requests_total",
            "Uploads and submissions rejected by validation",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pdfword_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "pdfword_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfword_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

// =============================================================================
// Job Metrics (collected dynamically)
// =============================================================================

/// Jobs by current status (collected dynamically).
pub static JOBS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("pdfword_jobs_by_status", "Current job count by status"),
        &["status"],
    )
    .unwrap()
});

/// Staged uploads not yet submitted (collected dynamically).
pub static STAGED_UPLOADS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pdfword_staged_uploads",
        "Number of staged uploads awaiting submission",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Uploads
    registry
        .register(Box::new(UPLOADED_FILES_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(UPLOADED_BYTES_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(REJECTED_REQUESTS_TOTAL.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();

    // Jobs
    registry.register(Box::new(JOBS_BY_STATUS.clone())).unwrap();
    registry.register(Box::new(STAGED_UPLOADS.clone())).unwrap();

    // Core metrics (job store, orchestrator)
    for metric in pdfword_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the store and staging area.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Ok(jobs) = state.job_store().list() {
        for status in ["pending", "running", "completed"] {
            let count = jobs.iter().filter(|j| j.status.as_str() == status).count();
            JOBS_BY_STATUS
                .with_label_values(&[status])
                .set(count as i64);
        }
    }
    STAGED_UPLOADS.set(state.staging().pending() as i64);
}

static UUID_RE: Lazy<regex_lite::Regex> = Lazy::new(|| {
    regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap()
});

static FILE_SEGMENT_RE: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/files/[^/]+$").unwrap());

/// Normalize a path for metric labels (replace IDs and file names with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_RE.replace_all(path, "{id}");
    let result = FILE_SEGMENT_RE.replace_all(&result, "/files/{name}");
    result.to_string()
}
