//! Event broadcaster for real-time observer updates
//!
//! Pure fan-out: no business logic. The engine sends while holding its state
//! write lock, so every observer sees events in the writer's order. Slow
//! observers may lag and miss intermediate events; they never see them out
//! of order.

use futures::stream::{self, Stream, StreamExt};
use jukebox_common::events::{JukeboxEvent, StatusSnapshot};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

/// Broadcaster manages observer subscriptions and event distribution
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<JukeboxEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer per observer (recommended: 100)
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        info!("Event broadcaster initialized with capacity {}", capacity);
        Self { tx }
    }

    /// Broadcast an event to all connected observers
    ///
    /// Returns Ok(subscriber_count) if successful, or Err if no observers are connected
    pub fn broadcast(
        &self,
        event: JukeboxEvent,
    ) -> Result<usize, broadcast::error::SendError<JukeboxEvent>> {
        let result = self.tx.send(event);
        if let Ok(count) = result {
            debug!("Broadcast event to {} observers", count);
        }
        result
    }

    /// Broadcast an event, ignoring if no observers are connected
    pub fn broadcast_lossy(&self, event: JukeboxEvent) {
        let _ = self.tx.send(event);
    }

    /// Get current number of connected observers
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Raw subscription; pair with [`observer_stream`]
    pub fn subscribe(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.tx.subscribe()
    }
}

/// Stream for one observer: `init` first, then live events
///
/// `rx` must have been subscribed no later than `init` was captured so no
/// event falls between the snapshot and the live feed.
pub fn observer_stream(
    init: StatusSnapshot,
    rx: broadcast::Receiver<JukeboxEvent>,
) -> impl Stream<Item = JukeboxEvent> {
    let live = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => Some(event),
            Err(e) => {
                // BroadcastStream wraps RecvError, just log and continue
                warn!("Observer lagged: {:?}", e);
                None
            }
        }
    });

    stream::once(async move { JukeboxEvent::Init(init) }).chain(live)
}
