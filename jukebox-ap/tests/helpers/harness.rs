//! Engine test harness
//!
//! Wires a started [`PlaybackEngine`] to the doubles and provides waiting
//! helpers for the asynchronous parts (auto-advance runs on the engine's
//! event loop).

use super::doubles::{FakeControl, RecordingLauncher, ScriptedResolver};
use jukebox_ap::config::EngineConfig;
use jukebox_ap::events::EventBroadcaster;
use jukebox_ap::playback::{EngineParts, EnginePhase, PlaybackEngine};
use jukebox_common::events::JukeboxEvent;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const WAIT: Duration = Duration::from_secs(3);

pub struct TestHarness {
    pub engine: Arc<PlaybackEngine>,
    pub launcher: RecordingLauncher,
    pub resolver: Arc<ScriptedResolver>,
    pub control: Arc<FakeControl>,
}

impl TestHarness {
    /// Started engine; the poller effectively never ticks after the first
    pub async fn start() -> Self {
        Self::with_poll_interval(Duration::from_secs(3600)).await
    }

    pub async fn with_poll_interval(poll_interval: Duration) -> Self {
        let launcher = RecordingLauncher::new();
        let resolver = Arc::new(ScriptedResolver::new());
        let control = Arc::new(FakeControl::new());

        let engine = PlaybackEngine::new(
            EngineConfig {
                poll_interval,
                initial_volume: 100,
            },
            Duration::ZERO,
            EngineParts {
                launcher: Arc::new(launcher.clone()),
                resolver: resolver.clone(),
                control: control.clone(),
            },
            EventBroadcaster::new(256),
        );
        engine.start().await.expect("engine start");

        Self {
            engine,
            launcher,
            resolver,
            control,
        }
    }

    pub fn events(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.engine.broadcaster().subscribe()
    }

    /// Enqueue several URLs; the first one auto-plays
    pub async fn enqueue_all(&self, urls: &[&str]) {
        for url in urls {
            self.engine.enqueue(url).await.expect("enqueue");
        }
    }

    pub async fn wait_for_phase(&self, phase: EnginePhase) {
        let engine = Arc::clone(&self.engine);
        wait_until(|| {
            let engine = Arc::clone(&engine);
            async move { engine.phase().await == phase }
        })
        .await;
    }

    pub async fn wait_for_launches(&self, count: usize) {
        let launcher = self.launcher.clone();
        wait_until(|| {
            let launcher = launcher.clone();
            async move { launcher.launches().len() >= count }
        })
        .await;
    }

    pub async fn wait_for_stream_request(&self, url: &str) {
        let resolver = Arc::clone(&self.resolver);
        let url = url.to_string();
        wait_until(|| {
            let resolver = Arc::clone(&resolver);
            let url = url.clone();
            async move { resolver.stream_requests().contains(&url) }
        })
        .await;
    }

    pub async fn current_index(&self) -> i64 {
        self.engine.status().await.current_queue_index
    }

    /// The central safety property, checked after every scenario
    pub fn assert_single_player(&self) {
        assert!(
            self.launcher.max_live() <= 1,
            "more than one player was alive at once"
        );
        assert!(
            self.launcher.violations().is_empty(),
            "launcher violations: {:?}",
            self.launcher.violations()
        );
    }
}

/// Poll `condition` until it holds or [`WAIT`] elapses
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(WAIT, async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Next event accepted by `matches`, skipping everything else
pub async fn next_event<F>(rx: &mut broadcast::Receiver<JukeboxEvent>, mut matches: F) -> JukeboxEvent
where
    F: FnMut(&JukeboxEvent) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("broadcaster closed"),
            }
        }
    })
    .await
    .expect("event not received in time")
}

/// Everything broadcast within `window`
pub async fn drain_events(
    rx: &mut broadcast::Receiver<JukeboxEvent>,
    window: Duration,
) -> Vec<JukeboxEvent> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + window;
    while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        events.push(event);
    }
    events
}

pub fn is_queue_playing(event: &JukeboxEvent) -> bool {
    matches!(event, JukeboxEvent::QueuePlaying { .. })
}
