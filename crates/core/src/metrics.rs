//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job store (jobs created)
//! - Orchestrator (file conversions, durations, completed jobs)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs accepted by the store.
pub static JOBS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("pdfword_jobs_created_total", "Total conversion jobs created").unwrap()
});

/// Jobs that reached the completed state, by overall result.
pub static JOBS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfword_jobs_completed_total", "Total jobs completed"),
        &["result"], // "all_succeeded", "partial", "all_failed"
    )
    .unwrap()
});

/// Jobs currently being processed.
pub static JOBS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("pdfword_jobs_active", "Jobs currently being processed").unwrap()
});

// =============================================================================
// Conversions
// =============================================================================

/// File conversions by result.
pub static FILE_CONVERSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pdfword_file_conversions_total", "Total file conversions"),
        &["result"], // "succeeded", "failed", "timeout", "internal"
    )
    .unwrap()
});

/// Duration of a single file conversion in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "pdfword_conversion_duration_seconds",
            "Duration of a single PDF to DOCX conversion",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_CREATED.clone()),
        Box::new(JOBS_COMPLETED.clone()),
        Box::new(JOBS_ACTIVE.clone()),
        Box::new(FILE_CONVERSIONS.clone()),
        Box::new(CONVERSION_DURATION.clone()),
    ]
}
