//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{ConnectionEvent, SessionEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// View changes, reconciliations, rejected intents
    Session,
    /// Feed connectivity
    Connection,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RuntimeEvent {
    Session(SessionEvent),
    Connection(ConnectionEvent),
}

impl RuntimeEvent {
    pub fn topic(&self) -> Topic {
        match self {
            RuntimeEvent::Session(_) => Topic::Session,
            RuntimeEvent::Connection(_) => Topic::Connection,
        }
    }
}

impl From<SessionEvent> for RuntimeEvent {
    fn from(event: SessionEvent) -> Self {
        RuntimeEvent::Session(event)
    }
}

impl From<ConnectionEvent> for RuntimeEvent {
    fn from(event: ConnectionEvent) -> Self {
        RuntimeEvent::Connection(event)
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Topics are fixed, so each owns one channel.
#[derive(Clone)]
pub struct EventBus {
    session: broadcast::Sender<RuntimeEvent>,
    connection: broadcast::Sender<RuntimeEvent>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            session: broadcast::channel(capacity).0,
            connection: broadcast::channel(capacity).0,
        }
    }

    fn channel(&self, topic: Topic) -> &broadcast::Sender<RuntimeEvent> {
        match topic {
            Topic::Session => &self.session,
            Topic::Connection => &self.connection,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: impl Into<RuntimeEvent>) {
        let event = event.into();
        let topic = event.topic();

        if self.channel(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<RuntimeEvent> {
        self.channel(topic).subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
