//! Event bus for broadcasting events to subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::event::PlatformEvent;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Event bus for broadcasting events to all subscribers.
///
/// The bus uses a broadcast channel to deliver events to all connected
/// receivers. Events are delivered asynchronously and in order. Cloning the
/// bus shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Sender for broadcasting events.
    sender: broadcast::Sender<Arc<PlatformEvent>>,
    /// Channel capacity.
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that the event was delivered to.
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: PlatformEvent) -> usize {
        let event = Arc::new(event);

        trace!(event_type = %event.event_type(), topic = %event.topic(), "Publishing event");

        if let Ok(count) = self.sender.send(Arc::clone(&event)) {
            debug!(
                event_type = %event.event_type(),
                receiver_count = count,
                "Event published"
            );
            count
        } else {
            trace!(event_type = %event.event_type(), "No receivers for event");
            0
        }
    }

    /// Subscribe to all events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), None)
    }

    /// Subscribe to events whose topic matches a pattern.
    ///
    /// The pattern is an exact match (e.g. `platform.app.started`) or a
    /// trailing wildcard (e.g. `app.notes.*`). Middle wildcards are treated
    /// as literal text.
    #[must_use]
    pub fn subscribe_topic(&self, topic_pattern: impl Into<String>) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), Some(topic_pattern.into()))
    }

    /// Current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for events from the event bus.
///
/// Dropping the receiver unsubscribes it.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<PlatformEvent>>,
    /// Optional topic pattern; when set, non-matching events are skipped.
    topic_pattern: Option<String>,
}

impl EventReceiver {
    fn new(
        receiver: broadcast::Receiver<Arc<PlatformEvent>>,
        topic_pattern: Option<String>,
    ) -> Self {
        Self {
            receiver,
            topic_pattern,
        }
    }

    /// Check if an event matches our topic pattern.
    fn matches(&self, event: &PlatformEvent) -> bool {
        let Some(pattern) = &self.topic_pattern else {
            return true;
        };
        let topic = event.topic();
        if let Some(prefix) = pattern.strip_suffix('*') {
            topic.starts_with(prefix)
        } else {
            topic == *pattern
        }
    }

    /// Receive the next matching event.
    ///
    /// Returns `None` once the channel is closed. Lagged receivers log a
    /// warning and keep receiving.
    pub async fn recv(&mut self) -> Option<Arc<PlatformEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next matching event without blocking.
    pub fn try_recv(&mut self) -> Option<Arc<PlatformEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}
