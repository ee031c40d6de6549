//! Per-consumer relay actor

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::bus::PubSubBus;
use crate::store::StoreSnapshot;

use super::accumulator::RelayAccumulator;
use super::messages::RelayMessage;

/// Registration parameters delivered once at relay creation.
#[derive(Debug, Clone)]
pub struct RelayInit {
    pub owner_id: String,
    pub name: String,
    pub interval: Duration,
}

/// Channel name for a plugin registration: `{name}__{owner_id}`.
pub fn channel_name(name: &str, owner_id: &str) -> String {
    format!("{name}__{owner_id}")
}

/// Actor that merges incoming snapshots and flushes batched messages on
/// its own timer.
///
/// The feed receiver and the flush timer are polled on the same task, so
/// a flush never interleaves with a merge. Closing the feed (dispatcher
/// deregistration or shutdown) triggers one final flush, then the actor
/// exits.
pub struct PluginRelay {
    name: String,
    interval: Duration,
    feed: mpsc::UnboundedReceiver<StoreSnapshot>,
    channel: broadcast::Sender<RelayMessage>,
    accumulator: RelayAccumulator,
}

impl PluginRelay {
    /// Open the relay's broadcast channel and build the actor. The
    /// returned relay still has to be spawned with [`PluginRelay::run`].
    ///
    /// The feed is unbounded: incremental fields (breakpoint and
    /// unit-test status deltas) must never be lost, so a slow relay
    /// buffers rather than dropping snapshots.
    pub fn new(
        init: RelayInit,
        feed: mpsc::UnboundedReceiver<StoreSnapshot>,
        bus: &Arc<PubSubBus>,
    ) -> Self {
        let channel = bus.channel(&channel_name(&init.name, &init.owner_id));
        info!(
            name = %init.name,
            interval_ms = %init.interval.as_millis(),
            "PluginRelay::new: broadcasting on {}",
            channel_name(&init.name, &init.owner_id)
        );
        Self {
            name: init.name,
            interval: init.interval,
            feed,
            channel,
            accumulator: RelayAccumulator::new(),
        }
    }

    /// Run the relay until its feed closes.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // Pending merges win over a due tick, so a flush always
            // observes the freshest accumulator state.
            tokio::select! {
                biased;
                snapshot = self.feed.recv() => match snapshot {
                    Some(snapshot) => self.accumulator.merge(snapshot),
                    None => {
                        self.flush();
                        break;
                    }
                },
                _ = ticker.tick() => self.flush(),
            }
        }

        debug!(name = %self.name, "PluginRelay::run: feed closed, relay stopped");
    }

    fn flush(&mut self) {
        if self.accumulator.is_empty() {
            return;
        }

        let batch = self.accumulator.drain();
        debug!(name = %self.name, batch_len = batch.len(), "PluginRelay::flush");
        for message in batch {
            // Best-effort: a send fails only when no subscriber is
            // listening, which is not the relay's problem.
            let _ = self.channel.send(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SimulationStatus;

    fn init(name: &str, interval_ms: u64) -> RelayInit {
        RelayInit {
            owner_id: "owner-1".to_string(),
            name: name.to_string(),
            interval: Duration::from_millis(interval_ms),
        }
    }

    #[test]
    fn test_channel_name_format() {
        assert_eq!(channel_name("monitor", "abc"), "monitor__abc");
    }

    #[tokio::test]
    async fn test_relay_flushes_merged_snapshots_on_tick() {
        let bus = Arc::new(PubSubBus::new());
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let relay = PluginRelay::new(init("watch", 20), feed_rx, &bus);
        let mut rx = bus.subscribe("watch__owner-1");

        // Queue both snapshots before the relay starts: pending merges
        // are drained ahead of the first flush tick.
        feed_tx
            .send(StoreSnapshot {
                messages: Some(vec!["a".to_string()]),
                ..Default::default()
            })
            .unwrap();
        feed_tx
            .send(StoreSnapshot {
                messages: Some(vec!["b".to_string()]),
                simulation_status: Some(SimulationStatus::Start),
                ..Default::default()
            })
            .unwrap();

        let task = tokio::spawn(relay.run());

        // One tick flushes exactly one message per populated field,
        // with the latest value winning.
        let first = rx.recv().await.unwrap();
        assert_eq!(first, RelayMessage::Messages(vec!["b".to_string()]));
        let second = rx.recv().await.unwrap();
        assert_eq!(
            second,
            RelayMessage::SimulationStatus(SimulationStatus::Start)
        );

        drop(feed_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_relay_stays_silent() {
        let bus = Arc::new(PubSubBus::new());
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let relay = PluginRelay::new(init("quiet", 10), feed_rx, &bus);
        let mut rx = bus.subscribe("quiet__owner-1");
        let task = tokio::spawn(relay.run());

        // Several empty ticks pass; nothing may arrive.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        drop(feed_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_relay_flushes_remainder_on_close() {
        let bus = Arc::new(PubSubBus::new());
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        // Long interval: the timer will not fire during the test.
        let relay = PluginRelay::new(init("tail", 60_000), feed_rx, &bus);
        let mut rx = bus.subscribe("tail__owner-1");
        let task = tokio::spawn(relay.run());

        // The first interval tick fires immediately with an empty
        // accumulator, then not again.
        tokio::time::sleep(Duration::from_millis(20)).await;

        feed_tx
            .send(StoreSnapshot {
                warnings: Some(vec!["pending".to_string()]),
                ..Default::default()
            })
            .unwrap();
        drop(feed_tx);
        task.await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg, RelayMessage::Warnings(vec!["pending".to_string()]));
    }
}
