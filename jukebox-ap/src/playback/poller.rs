//! Playback state poller
//!
//! Refreshes position, duration and pause state from the running player on a
//! fixed interval and broadcasts an `update` after each merged read.

use super::engine::{PlaybackEngine, PollReading};
use crate::control::PlayerControl;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Spawn the polling task
pub fn spawn(engine: Arc<PlaybackEngine>, period: Duration) -> JoinHandle<()> {
    let period = period.max(MIN_PERIOD);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("Playback poller started ({:?})", period);

        loop {
            ticker.tick().await;
            poll_once(&engine).await;
        }
    })
}

/// One tick; does nothing unless a player is active
pub async fn poll_once(engine: &PlaybackEngine) {
    let Some(generation) = engine.active_generation().await else {
        return;
    };

    // No engine lock is held while these are in flight
    let reading = read_progress(engine.control().as_ref()).await;
    if reading.is_empty() {
        trace!(generation, "All progress reads failed; skipping tick");
        return;
    }

    engine.apply_poll(generation, reading).await;
}

/// Issue the three property reads concurrently
pub async fn read_progress(control: &dyn PlayerControl) -> PollReading {
    let (position, duration, paused) = tokio::join!(
        control.get_property("time-pos"),
        control.get_property("duration"),
        control.get_property("pause"),
    );

    PollReading {
        position_secs: position.ok().map(as_seconds),
        duration_secs: duration.ok().map(as_seconds),
        paused: paused.ok().map(|v| v.as_bool().unwrap_or(false)),
    }
}

/// `null` (nothing loaded yet) reads as zero
fn as_seconds(value: Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}
