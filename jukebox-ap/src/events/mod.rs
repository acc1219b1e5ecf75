//! Observer event distribution

pub mod broadcaster;

pub use broadcaster::{observer_stream, EventBroadcaster};
pub use jukebox_common::events::{JukeboxEvent, QueueEntry, StatusSnapshot};
