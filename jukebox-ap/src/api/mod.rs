//! HTTP control surface and observer transports
//!
//! JSON commands for queue and playback control, plus the two push transports
//! (SSE on `/events`, WebSocket on `/ws`) that feed observers from the engine's
//! broadcaster.

pub mod extract;
pub mod handlers;
pub mod sse;
pub mod ws;

use crate::playback::PlaybackEngine;
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Playback engine
    pub engine: Arc<PlaybackEngine>,
    /// Server start time
    pub started_at: DateTime<Utc>,
    /// Server port
    pub port: u16,
}

impl AppState {
    pub fn new(engine: Arc<PlaybackEngine>, port: u16) -> Self {
        Self {
            engine,
            started_at: Utc::now(),
            port,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))

        // Queue management
        .route("/queue/add", post(handlers::add_to_queue))
        .route("/queue/remove", post(handlers::remove_from_queue))
        .route("/queue/clear", post(handlers::clear_queue))
        .route("/queue/play", post(handlers::play_index))
        .route("/queue/next", post(handlers::next))
        .route("/queue/previous", post(handlers::previous))

        // Playback control
        .route("/pause", post(handlers::toggle_pause))
        .route("/stop", post(handlers::stop))
        .route("/volume", post(handlers::set_volume))
        .route("/seek", post(handlers::seek))

        // Observers
        .route("/events", get(sse::event_stream))
        .route("/ws", get(ws::ws_handler))

        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
