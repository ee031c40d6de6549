//! Dispatcher task: owns the relay set, fans snapshots out unmodified

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::PubSubBus;
use crate::relay::{PluginRelay, RelayInit, channel_name};
use crate::store::StoreSnapshot;

use super::config::DispatcherConfig;
use super::messages::{DispatchRequest, RegistrationStatus};

struct RelaySlot {
    feed_tx: mpsc::UnboundedSender<StoreSnapshot>,
    channel: String,
    task: JoinHandle<()>,
}

/// Owns the name→relay map and forwards every published snapshot to
/// every registered relay; all per-consumer differentiation happens
/// inside the relays.
pub struct Dispatcher {
    owner_id: String,
    bus: Arc<PubSubBus>,
    tx: mpsc::Sender<DispatchRequest>,
    rx: mpsc::Receiver<DispatchRequest>,
}

impl Dispatcher {
    pub fn new(owner_id: &str, bus: Arc<PubSubBus>, config: DispatcherConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        Self {
            owner_id: owner_id.to_string(),
            bus,
            tx,
            rx,
        }
    }

    /// Get a sender for creating frontend handles.
    pub fn sender(&self) -> mpsc::Sender<DispatchRequest> {
        self.tx.clone()
    }

    /// Run the dispatcher task until shutdown.
    pub async fn run(mut self) {
        let mut relays: HashMap<String, RelaySlot> = HashMap::new();

        info!(owner_id = %self.owner_id, "Dispatcher started");

        while let Some(req) = self.rx.recv().await {
            match req {
                DispatchRequest::Register {
                    name,
                    interval,
                    reply_tx,
                } => {
                    if relays.contains_key(&name) {
                        warn!(%name, "Duplicate plugin registration rejected");
                        let _ = reply_tx.send(RegistrationStatus::Rejected);
                        continue;
                    }

                    let (feed_tx, feed_rx) = mpsc::unbounded_channel();
                    let relay = PluginRelay::new(
                        RelayInit {
                            owner_id: self.owner_id.clone(),
                            name: name.clone(),
                            interval,
                        },
                        feed_rx,
                        &self.bus,
                    );
                    let task = tokio::spawn(relay.run());

                    info!(%name, interval_ms = %interval.as_millis(), "Plugin registered");
                    relays.insert(
                        name.clone(),
                        RelaySlot {
                            feed_tx,
                            channel: channel_name(&name, &self.owner_id),
                            task,
                        },
                    );
                    let _ = reply_tx.send(RegistrationStatus::Accepted);
                }

                DispatchRequest::Deregister { name } => {
                    let Some(slot) = relays.remove(&name) else {
                        debug!(%name, "Deregister for unknown plugin ignored");
                        continue;
                    };

                    // Closing the feed lets the relay flush and exit.
                    drop(slot.feed_tx);
                    let _ = slot.task.await;
                    self.bus.remove(&slot.channel);
                    info!(%name, "Plugin deregistered");
                }

                DispatchRequest::Publish { snapshot } => {
                    for (name, slot) in &relays {
                        // Unbounded feed: a slow relay buffers, it never
                        // loses incremental status deltas.
                        if slot.feed_tx.send(snapshot.clone()).is_err() {
                            warn!(%name, "Relay feed closed");
                        }
                    }
                }

                DispatchRequest::Shutdown => {
                    info!("Dispatcher shutting down");
                    break;
                }
            }
        }

        // Close every feed and wait for the relays' final flush.
        for (_, slot) in relays.drain() {
            drop(slot.feed_tx);
            let _ = slot.task.await;
        }

        info!("Dispatcher stopped");
    }
}
