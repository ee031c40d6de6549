//! In-process publish/subscribe bus
//!
//! Named, multi-subscriber, ordered, best-effort broadcast channels.
//! Each relay publishes on its own channel; any number of consumers may
//! join by name. Messages sent before a subscriber joins are not
//! delivered to it, and a lagging subscriber loses the oldest messages
//! rather than exerting backpressure.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::debug;

use crate::relay::RelayMessage;

/// Default per-channel ring capacity before a lagging subscriber drops.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Registry of named broadcast channels scoped to the process.
pub struct PubSubBus {
    channels: RwLock<HashMap<String, broadcast::Sender<RelayMessage>>>,
    capacity: usize,
}

impl PubSubBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Create or join the channel with the given name.
    pub fn channel(&self, name: &str) -> broadcast::Sender<RelayMessage> {
        if let Some(sender) = self.channels.read().expect("bus lock poisoned").get(name) {
            return sender.clone();
        }

        let mut channels = self.channels.write().expect("bus lock poisoned");
        channels
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(%name, "PubSubBus::channel: created");
                broadcast::channel(self.capacity).0
            })
            .clone()
    }

    /// Subscribe to a channel by name, creating it if needed.
    pub fn subscribe(&self, name: &str) -> broadcast::Receiver<RelayMessage> {
        self.channel(name).subscribe()
    }

    /// Tear down a channel. Existing subscribers observe a closed stream
    /// once in-flight messages are drained.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self
            .channels
            .write()
            .expect("bus lock poisoned")
            .remove(name)
            .is_some();
        if removed {
            debug!(%name, "PubSubBus::remove: channel removed");
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels
            .read()
            .expect("bus lock poisoned")
            .contains_key(name)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().expect("bus lock poisoned").len()
    }
}

impl Default for PubSubBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_is_created_once() {
        let bus = PubSubBus::new();
        let a = bus.channel("plugin__1");
        let b = bus.channel("plugin__1");

        // Both handles address the same underlying channel.
        let mut rx = b.subscribe();
        a.send(RelayMessage::Messages(vec!["hi".to_string()])).unwrap();
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.discriminant(), 0);
        assert_eq!(bus.channel_count(), 1);
    }

    #[tokio::test]
    async fn test_ordered_delivery_to_multiple_subscribers() {
        let bus = PubSubBus::new();
        let tx = bus.channel("monitor__1");
        let mut rx1 = bus.subscribe("monitor__1");
        let mut rx2 = bus.subscribe("monitor__1");

        tx.send(RelayMessage::Messages(vec!["a".to_string()])).unwrap();
        tx.send(RelayMessage::Warnings(vec!["b".to_string()])).unwrap();

        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(rx.recv().await.unwrap().discriminant(), 0);
            assert_eq!(rx.recv().await.unwrap().discriminant(), 1);
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_messages() {
        let bus = PubSubBus::new();
        let tx = bus.channel("late__1");
        // Keep one subscriber alive so the send has a receiver.
        let _early = bus.subscribe("late__1");

        tx.send(RelayMessage::Messages(vec!["gone".to_string()])).unwrap();

        let mut rx = bus.subscribe("late__1");
        tx.send(RelayMessage::Warnings(vec!["seen".to_string()])).unwrap();

        // The late joiner sees only what was sent after it subscribed.
        assert_eq!(rx.recv().await.unwrap().discriminant(), 1);
    }

    #[tokio::test]
    async fn test_remove_channel() {
        let bus = PubSubBus::new();
        bus.channel("gone__1");
        assert!(bus.contains("gone__1"));
        assert!(bus.remove("gone__1"));
        assert!(!bus.contains("gone__1"));
        assert!(!bus.remove("gone__1"));
    }
}
