//! Bridge activity stream for external observers (status window, log tail).
//!
//! The core publishes into a broadcast channel and never waits on readers;
//! a send with no subscribers is simply dropped.

use serde::Serialize;
use tokio::sync::broadcast;

/// Events published by the core
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// Credential committed or cleared
    ConnectionChanged {
        connected: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    /// Human-readable progress line
    Activity { message: String },
}

/// Cloneable handle to the event channel
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: BridgeEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn activity(&self, message: impl Into<String>) {
        self.publish(BridgeEvent::Activity {
            message: message.into(),
        });
    }

    pub fn connection_changed(&self, connected: bool, username: Option<String>) {
        self.publish(BridgeEvent::ConnectionChanged {
            connected,
            username,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
