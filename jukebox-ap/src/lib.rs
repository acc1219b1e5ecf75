//! # Jukebox Audio Player Library (jukebox-ap)
//!
//! Remote-controlled music player: clients submit track URLs, the server
//! resolves a playable stream, supervises a single external player process at a
//! time and streams live playback state to every connected observer.
//!
//! **Architecture:** one orchestrator ([`playback::PlaybackEngine`]) is the only
//! writer of queue and playback state; the player process, the stream resolver
//! and the player's control socket sit behind traits so they can be replaced.

pub mod api;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod playback;
pub mod player;
pub mod resolver;

pub use error::{Error, Result};
pub use playback::PlaybackEngine;
