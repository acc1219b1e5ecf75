//! Server-Sent Events transport
//!
//! Each connection receives `init` with the full snapshot, then every
//! broadcast event. The SSE `event:` field carries the message `type`.

use super::AppState;
use crate::events::observer_stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

/// GET /events - SSE event stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (snapshot, rx) = state.engine.subscribe().await;
    debug!(
        "New SSE observer connected ({} total)",
        state.engine.broadcaster().client_count()
    );

    let stream = observer_stream(snapshot, rx).filter_map(|event| async move {
        match Event::default().event(event.event_type()).json_data(&event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(e) => {
                warn!("Failed to serialize event: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
