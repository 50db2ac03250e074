//! WebSocket progress stream for a single job.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use pdfword_core::{ProgressEvent, Subscription};

use super::error::ApiError;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Upgrade to a WebSocket carrying the job's progress events.
///
/// Subscribers joining late first receive the events already published,
/// so a client connecting after the job finished still gets `complete`.
pub async fn job_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    state.job_store().get(&job_id)?;
    let subscription = state.progress().subscribe(&job_id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, job_id, subscription)))
}

async fn handle_socket(socket: WebSocket, job_id: String, mut subscription: Subscription) {
    let (mut sender, mut receiver) = socket.split();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!(job_id = %job_id, "WebSocket client connected");

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else {
                    debug!(job_id = %job_id, "Progress stream ended");
                    break;
                };
                if !send_event(&mut sender, &event).await {
                    debug!(job_id = %job_id, "WebSocket send failed, client disconnected");
                    break;
                }
                if event.is_complete() {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
            message = receiver.next() => {
                match message {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(job_id = %job_id, "WebSocket client requested close");
                        break;
                    }
                    Some(Ok(Message::Text(text))) => {
                        debug!("Ignoring client message: {}", text.as_str());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    WS_CONNECTIONS_ACTIVE.dec();
    info!(job_id = %job_id, "WebSocket client disconnected");
}

/// Returns false once the client can no longer be reached.
async fn send_event<S>(sender: &mut S, event: &ProgressEvent) -> bool
where
    S: futures::Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize ProgressEvent: {}", e);
            return true;
        }
    };
    WS_MESSAGES_SENT.with_label_values(&[event.kind()]).inc();
    sender.send(Message::Text(json.into())).await.is_ok()
}
