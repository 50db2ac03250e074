//! Job registry for batch conversions.
//!
//! A job is one submitted batch. Its file list is fixed at creation, its
//! status only moves forward (`pending → running → completed`) and each
//! file's outcome is written exactly once.

mod error;
mod memory;
mod store;
mod types;

pub use error::JobError;
pub use memory::InMemoryJobStore;
pub use store::JobStore;
pub use types::{FileDescriptor, FileOutcome, FileTask, Job, JobStatus};
