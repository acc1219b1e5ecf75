//! Player supervisor
//!
//! Owns the lifecycle of at most one external player process.
//!
//! Invariant: at most one non-terminated player exists system-wide. `start`
//! must only follow a completed `stop_all` in the same logical operation.
//!
//! Terminal events reach the engine as [`EngineMessage::TrackEnded`] on its
//! inbox, exactly once per process, unless the supervisor stopped the process
//! itself (the handle is marked suppressed before it is killed).

use super::launcher::{ExitCause, LaunchRequest, PlayerLauncher, PlayerProcess};
use crate::error::Result;
use crate::playback::EngineMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Upper bound on waiting for a killed process to be reaped
const KILL_WAIT: Duration = Duration::from_secs(2);

/// The single live handle
struct ActivePlayer {
    generation: u64,
    pid: Option<u32>,
    suppressed: Arc<AtomicBool>,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: JoinHandle<()>,
}

impl ActivePlayer {
    /// Mark suppressed, kill, and wait for the watcher to finish
    async fn terminate(mut self) {
        self.suppressed.store(true, Ordering::SeqCst);
        if let Some(kill_tx) = self.kill_tx.take() {
            // Err means the watcher already finished
            let _ = kill_tx.send(());
        }

        match tokio::time::timeout(KILL_WAIT, &mut self.watcher).await {
            Ok(_) => debug!(
                generation = self.generation,
                pid = ?self.pid,
                "Player handle terminated"
            ),
            Err(_) => {
                warn!(
                    generation = self.generation,
                    pid = ?self.pid,
                    "Player did not terminate within {:?}, abandoning watcher",
                    KILL_WAIT
                );
                self.watcher.abort();
            }
        }
    }
}

/// Supervises the external player process
pub struct PlayerSupervisor {
    launcher: Arc<dyn PlayerLauncher>,
    settle_delay: Duration,
    events: mpsc::UnboundedSender<EngineMessage>,
    /// Held for the whole of `stop_all` and `start`
    active: Mutex<Option<ActivePlayer>>,
}

impl PlayerSupervisor {
    pub fn new(
        launcher: Arc<dyn PlayerLauncher>,
        settle_delay: Duration,
        events: mpsc::UnboundedSender<EngineMessage>,
    ) -> Self {
        Self {
            launcher,
            settle_delay,
            events,
            active: Mutex::new(None),
        }
    }

    /// Stop every player, owned or orphaned. Idempotent.
    ///
    /// Kills the owned handle without notifying the engine, sweeps all
    /// processes running the player executable, then waits the settle delay
    /// before returning.
    pub async fn stop_all(&self) {
        let mut active = self.active.lock().await;

        if let Some(player) = active.take() {
            info!(generation = player.generation, pid = ?player.pid, "Stopping player");
            player.terminate().await;
        }

        self.launcher.sweep().await;
        tokio::time::sleep(self.settle_delay).await;
    }

    /// Start a player for `stream`
    ///
    /// The terminal event will be tagged with `generation`.
    pub async fn start(&self, stream: &str, volume: u8, generation: u64) -> Result<()> {
        let mut active = self.active.lock().await;

        if let Some(previous) = active.take() {
            warn!(
                generation = previous.generation,
                "start called while a player handle is still owned; terminating it"
            );
            previous.terminate().await;
        }

        let request = LaunchRequest {
            stream: stream.to_string(),
            volume,
        };
        let process = self.launcher.launch(&request).await?;
        let pid = process.id();
        info!(generation, pid = ?pid, volume, "Player started");

        let suppressed = Arc::new(AtomicBool::new(false));
        let (kill_tx, kill_rx) = oneshot::channel();
        let watcher = tokio::spawn(watch(
            process,
            generation,
            Arc::clone(&suppressed),
            kill_rx,
            self.events.clone(),
        ));

        *active = Some(ActivePlayer {
            generation,
            pid,
            suppressed,
            kill_tx: Some(kill_tx),
            watcher,
        });

        Ok(())
    }

    /// True while the owned player has not terminated
    pub async fn is_running(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .map_or(false, |p| !p.watcher.is_finished())
    }
}

/// Wait for the terminal event and report it once
async fn watch(
    mut process: Box<dyn PlayerProcess>,
    generation: u64,
    suppressed: Arc<AtomicBool>,
    kill_rx: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<EngineMessage>,
) {
    let cause = tokio::select! {
        cause = process.wait() => cause,
        // Fires on an explicit kill and when the handle is dropped
        _ = kill_rx => {
            process.kill().await;
            ExitCause::Killed
        }
    };

    if suppressed.load(Ordering::SeqCst) {
        debug!(generation, %cause, "Player stop was intentional; not reporting");
        return;
    }

    if cause.is_crash() {
        warn!(generation, %cause, "Player terminated");
    } else {
        info!(generation, %cause, "Player finished");
    }

    if events
        .send(EngineMessage::TrackEnded { generation, cause })
        .is_err()
    {
        debug!("Engine inbox closed; dropping terminal event");
    }
}
