//! Playback engine - the orchestrator
//!
//! **Responsibilities:**
//! - Single writer of the queue cursor and playback state
//! - Track switching (stop old player, resolve stream, start new player)
//! - Reaction to terminal events and failed switches (auto-advance)
//! - User commands (enqueue, remove, clear, stop, volume, pause, seek)
//!
//! **Locking:**
//! - `state` is one coarse `RwLock`, never held across an external call.
//!   Broadcasts are sent while the write guard is held so every observer sees
//!   the writer's order.
//! - `switch_lock` serializes the switch decision points. It is released while
//!   a stream resolves; the generation counter discards whatever that
//!   resolution produces once something newer has happened.
//! - Terminal events and recovery requests arrive as [`EngineMessage`]s on the
//!   inbox and are handled by one event-loop task.

use super::poller;
use super::state::{EnginePhase, EngineState};
use crate::config::EngineConfig;
use crate::control::PlayerControl;
use crate::error::{Error, Result};
use crate::events::EventBroadcaster;
use crate::player::{ExitCause, PlayerLauncher, PlayerSupervisor};
use crate::resolver::TrackResolver;
use jukebox_common::events::{JukeboxEvent, QueueEntry, StatusSnapshot};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex, MutexGuard, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Messages delivered to the engine event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    /// A player process terminated on its own
    TrackEnded { generation: u64, cause: ExitCause },
    /// A switch failed; move on to the next entry
    RecoveryAdvance { generation: u64 },
}

/// What a switch request ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchOutcome {
    /// The requested entry is playing
    Playing,
    /// A newer switch, stop or clear overtook this one
    Superseded,
    /// Another switch held the lock; request ignored
    Dropped,
    /// Resolution or spawn failed; recovery advance posted
    Failed,
    /// Ran past the last entry; engine is idle
    Ended,
    /// Nothing to move to
    Unchanged,
}

/// External collaborators of the engine
pub struct EngineParts {
    pub launcher: Arc<dyn PlayerLauncher>,
    pub resolver: Arc<dyn TrackResolver>,
    pub control: Arc<dyn PlayerControl>,
}

/// Why the engine is going idle
#[derive(Debug, Clone, Copy)]
enum Halt {
    QueueEnded,
    Stopped,
    Cleared,
}

/// Values read by one poll; `None` means that read failed
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PollReading {
    pub position_secs: Option<f64>,
    pub duration_secs: Option<f64>,
    pub paused: Option<bool>,
}

impl PollReading {
    pub fn is_empty(&self) -> bool {
        self.position_secs.is_none() && self.duration_secs.is_none() && self.paused.is_none()
    }
}

/// Playback engine - orchestrates queue, player, resolver and observers
pub struct PlaybackEngine {
    state: RwLock<EngineState>,

    /// Guards the stop-old/set-cursor and check/start-new decision points
    switch_lock: Mutex<()>,

    supervisor: PlayerSupervisor,
    resolver: Arc<dyn TrackResolver>,
    control: Arc<dyn PlayerControl>,
    broadcaster: EventBroadcaster,
    config: EngineConfig,

    inbox_tx: mpsc::UnboundedSender<EngineMessage>,
    /// Taken by the event loop on start
    inbox_rx: Mutex<Option<mpsc::UnboundedReceiver<EngineMessage>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PlaybackEngine {
    pub fn new(
        config: EngineConfig,
        settle_delay: Duration,
        parts: EngineParts,
        broadcaster: EventBroadcaster,
    ) -> Arc<Self> {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let supervisor = PlayerSupervisor::new(parts.launcher, settle_delay, inbox_tx.clone());

        Arc::new(Self {
            state: RwLock::new(EngineState::new(config.initial_volume)),
            switch_lock: Mutex::new(()),
            supervisor,
            resolver: parts.resolver,
            control: parts.control,
            broadcaster,
            config,
            inbox_tx,
            inbox_rx: Mutex::new(Some(inbox_rx)),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Start the event loop and the playback poller
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut inbox = self
            .inbox_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Internal("Playback engine already started".to_string()))?;

        info!("Starting playback engine");

        let engine = Arc::clone(self);
        let event_loop = tokio::spawn(async move {
            while let Some(message) = inbox.recv().await {
                engine.handle_message(message).await;
            }
            debug!("Engine inbox closed");
        });

        let poller = poller::spawn(Arc::clone(self), self.config.poll_interval);

        self.tasks.lock().await.extend([event_loop, poller]);
        Ok(())
    }

    /// Stop background tasks and the player
    pub async fn shutdown(&self) {
        info!("Shutting down playback engine");
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        let _guard = self.switch_lock.lock().await;
        self.state.write().await.bump_generation();
        self.supervisor.stop_all().await;
        self.state.write().await.reset_to_idle();
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub async fn status(&self) -> StatusSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn phase(&self) -> EnginePhase {
        self.state.read().await.phase
    }

    /// Snapshot plus a live subscription with nothing lost in between
    ///
    /// Broadcasts happen under the state write lock, so subscribing under the
    /// read lock places the snapshot exactly before the first live event.
    pub async fn subscribe(&self) -> (StatusSnapshot, broadcast::Receiver<JukeboxEvent>) {
        let state = self.state.read().await;
        let rx = self.broadcaster.subscribe();
        (state.snapshot(), rx)
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    pub(crate) fn control(&self) -> &Arc<dyn PlayerControl> {
        &self.control
    }

    /// Generation of the running player while the engine is `Active`
    pub(crate) async fn active_generation(&self) -> Option<u64> {
        let state = self.state.read().await;
        match state.phase {
            EnginePhase::Active => state.player_generation,
            _ => None,
        }
    }

    /// Merge a poll result issued under `generation`
    pub(crate) async fn apply_poll(&self, generation: u64, reading: PollReading) {
        let mut state = self.state.write().await;
        if state.phase != EnginePhase::Active || state.player_generation != Some(generation) {
            debug!(generation, "Discarding stale poll result");
            return;
        }

        if let Some(position) = reading.position_secs {
            state.progress.position_secs = position.max(0.0);
        }
        if let Some(duration) = reading.duration_secs {
            state.progress.duration_secs = duration.max(0.0);
        }
        if let Some(paused) = reading.paused {
            state.progress.paused = paused;
        }

        self.broadcaster
            .broadcast_lossy(JukeboxEvent::Update(state.snapshot()));
    }

    // ========================================================================
    // Switching
    // ========================================================================

    /// Switch playback to queue entry `index`
    ///
    /// Dropped (not queued) when another switch is in progress.
    pub async fn play_index(&self, index: usize) -> Result<SwitchOutcome> {
        let guard = match self.switch_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(index, "Switch in progress; dropping play request");
                return Ok(SwitchOutcome::Dropped);
            }
        };
        self.switch_to(guard, index).await
    }

    /// Play the entry after the cursor (the first entry when idle), or end the queue
    pub async fn advance(&self) -> Result<SwitchOutcome> {
        let guard = match self.switch_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Switch in progress; dropping next request");
                return Ok(SwitchOutcome::Dropped);
            }
        };
        self.advance_locked(guard).await
    }

    /// Play the entry before the cursor; no-op at the first entry
    pub async fn retreat(&self) -> Result<SwitchOutcome> {
        let guard = match self.switch_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Switch in progress; dropping previous request");
                return Ok(SwitchOutcome::Dropped);
            }
        };

        let previous = self.state.read().await.queue.previous_index();
        match previous {
            Some(index) => self.switch_to(guard, index).await,
            None => Ok(SwitchOutcome::Unchanged),
        }
    }

    async fn advance_locked(&self, guard: MutexGuard<'_, ()>) -> Result<SwitchOutcome> {
        let next = self.state.read().await.queue.next_index();
        match next {
            Some(index) => self.switch_to(guard, index).await,
            None => {
                self.halt(&guard, Halt::QueueEnded).await;
                Ok(SwitchOutcome::Ended)
            }
        }
    }

    /// The switch protocol; consumes the caller's hold on the switch lock
    async fn switch_to(&self, guard: MutexGuard<'_, ()>, index: usize) -> Result<SwitchOutcome> {
        // New epoch before the old player goes away so its late events are stale
        let (generation, entry) = {
            let mut state = self.state.write().await;
            let entry = state.queue.get(index).cloned().ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "Queue index {} out of range (length {})",
                    index,
                    state.queue.len()
                ))
            })?;
            let generation = state.bump_generation();
            state.phase = EnginePhase::Switching;
            state.player_generation = None;
            (generation, entry)
        };

        self.supervisor.stop_all().await;

        {
            let mut state = self.state.write().await;
            // Cursor moves only under the switch lock, and appends never shift it
            state.queue.set_current(index);
            state.current_title = entry.title.clone();
            state.progress.reset();

            self.broadcaster.broadcast_lossy(JukeboxEvent::QueuePlaying {
                index,
                title: entry.title.clone(),
                queue: state.queue.entries().to_vec(),
                current_queue_index: state.queue.wire_index(),
            });
        }
        drop(guard);

        info!(generation, index, title = %entry.title, "Switching track");
        let resolved = self.resolver.resolve_stream(&entry.url).await;

        let _guard = self.switch_lock.lock().await;
        if self.state.read().await.generation != generation {
            debug!(generation, index, "Switch superseded during resolution");
            return Ok(SwitchOutcome::Superseded);
        }

        let stream = match resolved {
            Ok(stream) => stream,
            Err(e) => return Ok(self.fail_switch(generation, &entry, e).await),
        };

        // Something may have appeared while the lock was released
        self.supervisor.stop_all().await;

        let volume = self.state.read().await.volume;
        if let Err(e) = self.supervisor.start(&stream, volume, generation).await {
            return Ok(self.fail_switch(generation, &entry, e).await);
        }

        let mut state = self.state.write().await;
        state.phase = EnginePhase::Active;
        state.player_generation = Some(generation);
        state.consecutive_failures = 0;
        info!(generation, index, "Now playing: {}", entry.title);

        Ok(SwitchOutcome::Playing)
    }

    /// Record a failed switch and ask the event loop to move on
    async fn fail_switch(&self, generation: u64, entry: &QueueEntry, error: Error) -> SwitchOutcome {
        warn!(generation, url = %entry.url, "Cannot play {}: {}", entry.title, error);

        {
            let mut state = self.state.write().await;
            state.phase = EnginePhase::ErrorAdvancing;
            state.player_generation = None;
            state.consecutive_failures += 1;
        }

        if self
            .inbox_tx
            .send(EngineMessage::RecoveryAdvance { generation })
            .is_err()
        {
            debug!("Engine inbox closed; recovery advance dropped");
        }
        SwitchOutcome::Failed
    }

    /// Stop the player and go idle; caller holds the switch lock
    async fn halt(&self, _guard: &MutexGuard<'_, ()>, reason: Halt) {
        self.state.write().await.bump_generation();
        self.supervisor.stop_all().await;

        let mut state = self.state.write().await;
        if matches!(reason, Halt::Cleared) {
            state.queue.clear();
        }
        state.reset_to_idle();
        state.consecutive_failures = 0;

        let event = match reason {
            Halt::QueueEnded => JukeboxEvent::QueueEnded,
            Halt::Stopped => JukeboxEvent::Stopped,
            Halt::Cleared => JukeboxEvent::QueueCleared,
        };
        info!("Playback halted: {}", event.event_type());
        self.broadcaster.broadcast_lossy(event);
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    async fn handle_message(&self, message: EngineMessage) {
        match message {
            EngineMessage::TrackEnded { generation, cause } => {
                self.on_track_ended(generation, cause).await
            }
            EngineMessage::RecoveryAdvance { generation } => self.recover(generation).await,
        }
    }

    /// React to a player terminating on its own
    ///
    /// Acted on only if `generation` still names the running player once no
    /// switch holds the lock. Events from replaced players are ignored, and a
    /// player that dies while its own start is being recorded is not lost.
    pub async fn on_track_ended(&self, generation: u64, cause: ExitCause) {
        let guard = match self.switch_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(generation, "Terminal event during a switch; waiting for it");
                self.switch_lock.lock().await
            }
        };

        {
            let state = self.state.read().await;
            if state.phase != EnginePhase::Active || state.player_generation != Some(generation) {
                debug!(
                    generation,
                    current = state.generation,
                    phase = %state.phase,
                    "Ignoring terminal event from a replaced player"
                );
                return;
            }
        }

        if cause.is_crash() {
            warn!(generation, "{}", Error::PlayerCrash(cause.to_string()));
        } else {
            info!(generation, "Track finished ({})", cause);
        }

        if let Err(e) = self.advance_locked(guard).await {
            warn!("Auto-advance failed: {}", e);
        }
    }

    /// Move past a failed switch
    ///
    /// Once every entry has failed in a row the queue ends instead.
    async fn recover(&self, generation: u64) {
        let guard = self.switch_lock.lock().await;

        let give_up = {
            let state = self.state.read().await;
            if state.generation != generation || state.phase != EnginePhase::ErrorAdvancing {
                debug!(generation, "Ignoring stale recovery request");
                return;
            }
            state.consecutive_failures >= state.queue.len()
        };

        let result = if give_up {
            warn!("Every queue entry failed to play; ending queue");
            self.halt(&guard, Halt::QueueEnded).await;
            Ok(SwitchOutcome::Ended)
        } else {
            self.advance_locked(guard).await
        };

        match result {
            Ok(outcome) => debug!(?outcome, "Recovery advance finished"),
            Err(e) => warn!("Recovery advance failed: {}", e),
        }
    }

    // ========================================================================
    // Queue commands
    // ========================================================================

    /// Add a track; starts playing it when nothing is active
    pub async fn enqueue(&self, url: &str) -> Result<QueueEntry> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidRequest("url must not be empty".to_string()));
        }

        let title = match self.resolver.resolve_title(url).await {
            Ok(title) => title,
            Err(e) => {
                warn!(url, "Title lookup failed, using URL: {}", e);
                url.to_string()
            }
        };
        let entry = QueueEntry::new(url, title);

        let (index, idle) = {
            let mut state = self.state.write().await;
            let index = state.queue.enqueue(entry.clone());
            self.broadcaster.broadcast_lossy(JukeboxEvent::QueueUpdated {
                queue: state.queue.entries().to_vec(),
                current_queue_index: state.queue.wire_index(),
            });
            (index, state.phase == EnginePhase::Idle)
        };
        info!(index, id = %entry.id, "Enqueued: {}", entry.title);

        if idle {
            match self.play_index(index).await {
                Ok(outcome) => debug!(?outcome, "Auto-play after enqueue"),
                Err(e) => debug!("Auto-play after enqueue skipped: {}", e),
            }
        }

        Ok(entry)
    }

    /// Remove an entry by id and return the resulting queue
    ///
    /// Removing the active entry plays the entry that moved into its place,
    /// or ends the queue when nothing follows.
    pub async fn remove(&self, id: Uuid) -> Result<Vec<QueueEntry>> {
        let guard = self.switch_lock.lock().await;

        let (removal, remaining, queue) = {
            let mut state = self.state.write().await;
            let removal = state
                .queue
                .remove_by_id(id)
                .ok_or_else(|| Error::NotFound(format!("Queue entry {}", id)))?;
            let queue = state.queue.entries().to_vec();
            self.broadcaster.broadcast_lossy(JukeboxEvent::QueueUpdated {
                queue: queue.clone(),
                current_queue_index: state.queue.wire_index(),
            });
            (removal, state.queue.len(), queue)
        };
        info!(index = removal.index, "Removed: {}", removal.entry.title);

        if removal.was_current {
            if removal.index < remaining {
                let outcome = self.switch_to(guard, removal.index).await?;
                debug!(?outcome, "Replaced removed active entry");
            } else {
                self.halt(&guard, Halt::QueueEnded).await;
            }
        }

        Ok(queue)
    }

    /// Stop playback and empty the queue
    pub async fn clear(&self) {
        let guard = self.switch_lock.lock().await;
        self.halt(&guard, Halt::Cleared).await;
    }

    /// Stop playback; idempotent
    ///
    /// Waits for an in-flight switch instead of being dropped.
    pub async fn stop(&self) {
        let guard = self.switch_lock.lock().await;
        self.halt(&guard, Halt::Stopped).await;
    }

    // ========================================================================
    // Player commands
    // ========================================================================

    /// Store and apply a new volume (0-100)
    pub async fn set_volume(&self, volume: i64) -> Result<u8> {
        let volume = u8::try_from(volume)
            .ok()
            .filter(|v| *v <= 100)
            .ok_or_else(|| Error::InvalidRequest(format!("Volume {} outside 0-100", volume)))?;

        let active = {
            let mut state = self.state.write().await;
            state.volume = volume;
            self.broadcaster
                .broadcast_lossy(JukeboxEvent::Volume { volume });
            state.is_playing()
        };

        if active {
            if let Err(e) = self.control.set_property("volume", json!(volume)).await {
                debug!("Volume push to player failed: {}", e);
            }
        }

        Ok(volume)
    }

    /// Toggle pause on the running player; returns the new paused flag
    pub async fn toggle_pause(&self) -> Result<bool> {
        let generation = self.state.read().await.generation;
        self.control.cycle("pause").await?;

        let mut state = self.state.write().await;
        if state.generation == generation {
            state.progress.paused = !state.progress.paused;
        }
        let paused = state.progress.paused;
        self.broadcaster
            .broadcast_lossy(JukeboxEvent::Paused { paused });
        Ok(paused)
    }

    /// Seek the running player
    pub async fn seek(&self, position: f64, relative: bool) -> Result<()> {
        if !position.is_finite() {
            return Err(Error::InvalidRequest("position must be a finite number".to_string()));
        }
        self.control.seek(position, relative).await
    }
}
