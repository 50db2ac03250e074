//! Upload intake.
//!
//! Validates an uploaded batch as a whole, writes it to the staging
//! directory and hands out `file_id` handles that a later submission
//! resolves into job file descriptors.

mod error;
mod staging;
mod types;

pub use error::IntakeError;
pub use staging::StagingArea;
pub use types::{IntakeLimits, StagedFile, UploadedFile};
