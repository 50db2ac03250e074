//! Conversion orchestrator.
//!
//! Drives one job through its files strictly in order:
//! - one tokio task per job, jobs run concurrently
//! - per-file transcoder failures are recorded and never abort the batch
//! - internal faults and cancellation fail the remaining files, the job
//!   still completes and emits its summary

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::ConversionOrchestrator;
pub use types::{OrchestratorError, OrchestratorStatus};
