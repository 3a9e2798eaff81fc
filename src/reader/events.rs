//! Events emitted to the surrounding application

use super::connection::ConnectionState;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Notification published by a reader supervisor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReaderEvent {
    ConnectionStateChanged {
        reader: String,
        from: ConnectionState,
        to: ConnectionState,
    },
    GpiChanged {
        reader: String,
        port: u16,
        state: bool,
    },
    AntennaChanged {
        reader: String,
        port: u16,
        connected: bool,
    },
    TagDiscovered {
        reader: String,
        run_id: Uuid,
        epc: String,
        discovered_at: DateTime<Utc>,
    },
    InventoryFinished {
        reader: String,
        run_id: Uuid,
        /// Unique identifiers in order of first sighting
        tags: Vec<String>,
        finished_at: DateTime<Utc>,
    },
}

/// Fan-out of [`ReaderEvent`]s to any number of subscribers
///
/// Each subscriber gets its own unbounded queue, so a slow consumer never
/// loses events. Subscribers that dropped their receiver are pruned on the
/// next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ReaderEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ReaderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: ReaderEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpi_event(port: u16) -> ReaderEvent {
        ReaderEvent::GpiChanged {
            reader: "r".to_string(),
            port,
            state: true,
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_events() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(gpi_event(1));

        assert_eq!(first.recv().await, Some(gpi_event(1)));
        assert_eq!(second.recv().await, Some(gpi_event(1)));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(gpi_event(1));
        assert_eq!(bus.subscriber_count(), 1);
        drop(kept);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        bus.publish(gpi_event(3));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(gpi_event(2)).unwrap();
        assert_eq!(json["type"], "gpi_changed");
        assert_eq!(json["port"], 2);
    }
}
