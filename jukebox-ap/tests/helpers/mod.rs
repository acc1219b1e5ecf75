//! Test helper modules for jukebox-ap integration tests
//!
//! Provides reusable test infrastructure components:
//! - Doubles for the launcher, resolver and control channel
//! - TestHarness: started engine wired to the doubles, plus wait helpers

#![allow(dead_code)]

pub mod doubles;
pub mod harness;

pub use doubles::{FakeControl, RecordingLauncher, ScriptedResolver};
pub use harness::{drain_events, is_queue_playing, next_event, wait_until, TestHarness, WAIT};
