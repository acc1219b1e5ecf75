//! Playback state management
//!
//! The single state object owned by the engine. Collaborators never see the
//! raw fields; they get [`StatusSnapshot`]s.

use super::queue::PlaybackQueue;
use jukebox_common::events::StatusSnapshot;
use serde::{Deserialize, Serialize};

/// Composite phase of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    /// No track active
    Idle,
    /// Old player stopping, new stream resolving/starting
    Switching,
    /// Player running for the cursor entry
    Active,
    /// A switch failed; recovery advance pending
    ErrorAdvancing,
}

impl std::fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnginePhase::Idle => write!(f, "idle"),
            EnginePhase::Switching => write!(f, "switching"),
            EnginePhase::Active => write!(f, "active"),
            EnginePhase::ErrorAdvancing => write!(f, "error_advancing"),
        }
    }
}

/// Position/duration/pause as last reported by the player
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackProgress {
    pub duration_secs: f64,
    pub position_secs: f64,
    pub paused: bool,
}

impl PlaybackProgress {
    /// Zeroed and unpaused
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// All mutable orchestration state
#[derive(Debug)]
pub struct EngineState {
    pub queue: PlaybackQueue,
    /// Title of the active track, empty when idle
    pub current_title: String,
    pub progress: PlaybackProgress,
    /// 0-100, survives track switches
    pub volume: u8,
    pub phase: EnginePhase,
    /// Bumped on every switch, stop and clear
    pub generation: u64,
    /// Generation of the running player, if one is running
    pub player_generation: Option<u64>,
    /// Failed switches since the last successful start
    pub consecutive_failures: usize,
}

impl EngineState {
    pub fn new(volume: u8) -> Self {
        Self {
            queue: PlaybackQueue::new(),
            current_title: String::new(),
            progress: PlaybackProgress::default(),
            volume: volume.min(100),
            phase: EnginePhase::Idle,
            generation: 0,
            player_generation: None,
            consecutive_failures: 0,
        }
    }

    /// Start a new epoch; continuations from older epochs are discarded
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Back to `Idle` with nothing selected
    pub fn reset_to_idle(&mut self) {
        self.queue.clear_current();
        self.current_title.clear();
        self.progress.reset();
        self.phase = EnginePhase::Idle;
        self.player_generation = None;
    }

    /// True when a player is believed to be running
    pub fn is_playing(&self) -> bool {
        self.phase == EnginePhase::Active && self.player_generation.is_some()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            playing: self.is_playing(),
            paused: self.progress.paused,
            current_song: self.current_title.clone(),
            volume: self.volume,
            position: self.progress.position_secs,
            duration: self.progress.duration_secs,
            queue: self.queue.entries().to_vec(),
            current_queue_index: self.queue.wire_index(),
        }
    }
}
