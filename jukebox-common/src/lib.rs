//! # Jukebox Common Library
//!
//! Shared code for the Jukebox player service and its clients:
//! - Observer event types (JukeboxEvent enum) and queue entries
//! - TOML configuration loading with graceful degradation
//! - Error types

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{JukeboxEvent, QueueEntry, StatusSnapshot};
