//! Observer push protocol
//!
//! Every state-affecting operation of the player emits exactly one
//! [`JukeboxEvent`]. Messages are serialized as JSON objects carrying a
//! `type` discriminator; field names are camelCase on the wire so browser
//! clients can consume them unchanged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One queued playable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Opaque unique token, assigned on enqueue
    pub id: Uuid,
    /// URL the client submitted
    pub url: String,
    /// Resolved title, or the URL when resolution failed
    pub title: String,
}

impl QueueEntry {
    /// Create an entry with a fresh id
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Full composite state, sent on connect (`init`) and on every poll (`update`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// True while a player process is believed to be running
    pub playing: bool,
    pub paused: bool,
    /// Title of the active track, empty when idle
    pub current_song: String,
    /// 0-100
    pub volume: u8,
    /// Seconds
    pub position: f64,
    /// Seconds
    pub duration: f64,
    pub queue: Vec<QueueEntry>,
    /// Active index, -1 when nothing is selected
    pub current_queue_index: i64,
}

/// Messages pushed to every connected observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JukeboxEvent {
    /// Queue contents or cursor changed
    #[serde(rename_all = "camelCase")]
    QueueUpdated {
        queue: Vec<QueueEntry>,
        current_queue_index: i64,
    },

    /// A switch started; sent before the stream is resolved
    #[serde(rename_all = "camelCase")]
    QueuePlaying {
        index: usize,
        title: String,
        queue: Vec<QueueEntry>,
        current_queue_index: i64,
    },

    /// Playback ran past the last entry
    QueueEnded,

    /// Queue emptied by the user
    QueueCleared,

    /// Playback stopped by the user
    Stopped,

    /// Pause flag toggled
    Paused { paused: bool },

    /// Volume changed (0-100)
    Volume { volume: u8 },

    /// Periodic playback refresh
    Update(StatusSnapshot),

    /// First message on every new observer connection
    Init(StatusSnapshot),
}

impl JukeboxEvent {
    /// Wire name of the `type` discriminator
    pub fn event_type(&self) -> &'static str {
        match self {
            JukeboxEvent::QueueUpdated { .. } => "queue_updated",
            JukeboxEvent::QueuePlaying { .. } => "queue_playing",
            JukeboxEvent::QueueEnded => "queue_ended",
            JukeboxEvent::QueueCleared => "queue_cleared",
            JukeboxEvent::Stopped => "stopped",
            JukeboxEvent::Paused { .. } => "paused",
            JukeboxEvent::Volume { .. } => "volume",
            JukeboxEvent::Update(_) => "update",
            JukeboxEvent::Init(_) => "init",
        }
    }
}

/// Convert an optional cursor into its wire form
pub fn wire_index(index: Option<usize>) -> i64 {
    index.map(|i| i as i64).unwrap_or(-1)
}
