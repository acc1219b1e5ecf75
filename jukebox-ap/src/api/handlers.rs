//! HTTP request handlers
//!
//! Thin adapters from JSON requests onto [`PlaybackEngine`] operations.
//! Validation failures are rejected before anything is mutated.

use super::extract::{deserialize_loose_int, ApiJson};
use super::AppState;
use crate::error::{Error, Result};
use crate::playback::SwitchOutcome;
use axum::{extract::State, Json};
use jukebox_common::events::{QueueEntry, StatusSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    port: u16,
    started_at: String,
    observers: usize,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl SuccessResponse {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    success: bool,
    queue: Vec<QueueEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    #[serde(deserialize_with = "deserialize_loose_int")]
    index: i64,
}

#[derive(Debug, Serialize)]
pub struct SwitchResponse {
    success: bool,
    outcome: SwitchOutcome,
}

#[derive(Debug, Serialize)]
pub struct PauseResponse {
    success: bool,
    paused: bool,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    #[serde(deserialize_with = "deserialize_loose_int")]
    volume: i64, // 0-100, validated by the engine
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    success: bool,
    volume: u8,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    position: f64,
    #[serde(default)]
    relative: bool,
}

fn switched(outcome: SwitchOutcome) -> Json<SwitchResponse> {
    Json(SwitchResponse {
        success: true,
        outcome,
    })
}

// ============================================================================
// Status Endpoints
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "jukebox-ap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: state.port,
        started_at: state.started_at.to_rfc3339(),
        observers: state.engine.broadcaster().client_count(),
    })
}

/// GET /status - Composite playback status (same fields as `init`)
pub async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.engine.status().await)
}

// ============================================================================
// Queue Endpoints
// ============================================================================

/// POST /queue/add - Enqueue a track URL
///
/// Answers immediately; title lookup and auto-play continue in the background
/// and are reported to observers.
pub async fn add_to_queue(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EnqueueRequest>,
) -> Result<Json<SuccessResponse>> {
    let url = req
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::InvalidRequest("URL required".to_string()))?;

    info!("Enqueue request: {}", url);

    let engine = state.engine.clone();
    tokio::spawn(async move {
        if let Err(e) = engine.enqueue(&url).await {
            warn!("Background enqueue of {} failed: {}", url, e);
        }
    });

    Ok(Json(SuccessResponse::with_message("Added to queue")))
}

/// POST /queue/remove - Remove an entry by id
pub async fn remove_from_queue(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RemoveRequest>,
) -> Result<Json<QueueResponse>> {
    info!("Remove from queue request: {}", req.id);
    let queue = state.engine.remove(req.id).await?;
    Ok(Json(QueueResponse {
        success: true,
        queue,
    }))
}

/// POST /queue/clear - Stop playback and empty the queue
pub async fn clear_queue(State(state): State<AppState>) -> Json<SuccessResponse> {
    info!("Clear queue request");
    state.engine.clear().await;
    Json(SuccessResponse::ok())
}

/// POST /queue/play - Play the entry at `index`
pub async fn play_index(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PlayRequest>,
) -> Result<Json<SwitchResponse>> {
    let index = usize::try_from(req.index)
        .map_err(|_| Error::InvalidRequest(format!("Invalid index {}", req.index)))?;
    Ok(switched(state.engine.play_index(index).await?))
}

/// POST /queue/next
pub async fn next(State(state): State<AppState>) -> Result<Json<SwitchResponse>> {
    Ok(switched(state.engine.advance().await?))
}

/// POST /queue/previous
pub async fn previous(State(state): State<AppState>) -> Result<Json<SwitchResponse>> {
    Ok(switched(state.engine.retreat().await?))
}

// ============================================================================
// Playback Control Endpoints
// ============================================================================

/// POST /pause - Toggle pause on the running player
pub async fn toggle_pause(State(state): State<AppState>) -> Result<Json<PauseResponse>> {
    let paused = state.engine.toggle_pause().await?;
    info!("Playback {}", if paused { "paused" } else { "resumed" });
    Ok(Json(PauseResponse {
        success: true,
        paused,
    }))
}

/// POST /stop - Stop playback, keep the queue
pub async fn stop(State(state): State<AppState>) -> Json<SuccessResponse> {
    info!("Stop request");
    state.engine.stop().await;
    Json(SuccessResponse::ok())
}

/// POST /volume - Set volume (0-100)
pub async fn set_volume(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VolumeRequest>,
) -> Result<Json<VolumeResponse>> {
    let volume = state.engine.set_volume(req.volume).await?;
    info!("Volume set to {}%", volume);
    Ok(Json(VolumeResponse {
        success: true,
        volume,
    }))
}

/// POST /seek - Seek relative to the current position or to an absolute one
pub async fn seek(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SeekRequest>,
) -> Result<Json<SuccessResponse>> {
    state.engine.seek(req.position, req.relative).await?;
    if req.relative {
        info!("Seek {:+}s", req.position);
    } else {
        info!("Seek to {}s", req.position);
    }
    Ok(Json(SuccessResponse::ok()))
}
