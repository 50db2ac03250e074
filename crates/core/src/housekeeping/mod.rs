//! Retention sweep over completed jobs and stale uploads.

mod sweeper;

pub use sweeper::{Housekeeper, HousekeepingError, SweepReport};
