//! Per-job progress events.
//!
//! The orchestrator publishes through [`ProgressPublisher`]; the server
//! subscribes through [`ProgressHub`] and forwards events over WebSocket.

mod events;
mod hub;

pub use events::{ConvertedFile, ProgressEvent};
pub use hub::{ProgressHub, ProgressPublisher, Subscription};
