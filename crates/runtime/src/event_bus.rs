//! Per-turn ordered event fan-out to many subscribers (spec §4.D, §6).
//! Each subscriber gets its own bounded channel; a subscriber that falls
//! behind is dropped rather than allowed to block publication for
//! everyone else.

use dagctl_core::event::Event;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

const SUBSCRIBER_CAPACITY: usize = 256;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Event>,
}

/// Fans out every event published for a turn to all currently-subscribed
/// receivers (an SSE stream, a WebSocket connection, a CLI loop).
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: Mutex<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { subscribers: Mutex::new(Vec::new()), next_id: Mutex::new(0) }
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&self) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let mut id_guard = self.next_id.lock();
        let id = *id_guard;
        *id_guard += 1;
        self.subscribers.lock().push(Subscriber { id, tx });
        rx
    }

    /// Publish one event to every live subscriber. A subscriber whose
    /// channel is closed or full is dropped from the fan-out list.
    pub fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sub| match sub.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(subscriber = sub.id, "dropping slow event subscriber");
                false
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
