use tokio::sync::broadcast;
use tracing::debug;

use super::events::ChangeEvent;

const DEFAULT_CAPACITY: usize = 256;

/// Event bus for distributing change notifications throughout the application
///
/// The engines publish into the bus; transports (websockets, SSE, whatever the
/// outer layer uses) subscribe. Delivery is best-effort: lagging subscribers
/// drop events, and publishing with no subscribers is fine.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Publishes an event to all current subscribers
    pub fn emit(&self, event: ChangeEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Change event emitted");
            }
            Err(broadcast::error::SendError(event)) => {
                debug!(
                    event_type = event.event_type(),
                    "Change event emitted with no receivers"
                );
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
