//! Playback engine and queue management

pub mod engine;
pub mod poller;
pub mod queue;
pub mod state;

pub use engine::{EngineMessage, EngineParts, PlaybackEngine, PollReading, SwitchOutcome};
pub use queue::{PlaybackQueue, Removal};
pub use state::{EnginePhase, EngineState, PlaybackProgress};
