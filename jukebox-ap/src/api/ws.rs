//! WebSocket transport
//!
//! Same message sequence as SSE: `init` first, then every broadcast event as
//! one JSON text frame. Incoming frames other than close are ignored.

use super::AppState;
use crate::events::observer_stream;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

/// GET /ws - WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (snapshot, rx) = state.engine.subscribe().await;
    let events = observer_stream(snapshot, rx);
    tokio::pin!(events);

    debug!("WebSocket observer connected");

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize event: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    debug!("WebSocket observer disconnected");
}
