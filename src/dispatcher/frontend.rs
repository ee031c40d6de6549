//! Controller-side handle over the dispatcher task

use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::bus::PubSubBus;
use crate::commands::{CommandQueueClient, CommandRegion};
use crate::relay::channel_name;
use crate::store::{LiveStore, StoreSnapshot};

use super::config::DispatcherConfig;
use super::core::Dispatcher;
use super::messages::{DispatchRequest, RegistrationStatus};

/// Registration response: the channel name is always computed,
/// regardless of whether the registration was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginTicket {
    pub channel_name: String,
    pub status: RegistrationStatus,
}

/// Cloneable publish-only handle given to the engine side.
#[derive(Clone, Debug)]
pub struct SnapshotPublisher {
    tx: mpsc::Sender<DispatchRequest>,
}

impl SnapshotPublisher {
    /// Forward one snapshot into the dispatch tree.
    pub async fn publish(&self, snapshot: StoreSnapshot) -> Result<()> {
        self.tx
            .send(DispatchRequest::Publish { snapshot })
            .await
            .map_err(|_| eyre!("Dispatcher channel closed"))
    }

    /// Project the live store and publish, if anything changed.
    pub async fn publish_store(&self, store: &mut LiveStore) -> Result<()> {
        if let Some(snapshot) = store.take_snapshot() {
            self.publish(snapshot).await?;
        }
        Ok(())
    }
}

/// Controller-thread handle: owns the dispatcher task, the pub/sub bus
/// and the single command-queue client.
pub struct DispatcherFrontend {
    owner_id: String,
    bus: Arc<PubSubBus>,
    tx: mpsc::Sender<DispatchRequest>,
    task: JoinHandle<()>,
    commands: Option<CommandQueueClient>,
}

impl DispatcherFrontend {
    /// Spawn a dispatcher for the given engine instance id.
    pub fn spawn(owner_id: &str, config: DispatcherConfig) -> Self {
        let bus = Arc::new(PubSubBus::with_capacity(config.bus_capacity));
        let dispatcher = Dispatcher::new(owner_id, bus.clone(), config);
        let tx = dispatcher.sender();
        let task = tokio::spawn(dispatcher.run());

        Self {
            owner_id: owner_id.to_string(),
            bus,
            tx,
            task,
            commands: None,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn bus(&self) -> Arc<PubSubBus> {
        self.bus.clone()
    }

    /// Publish-only handle for the engine side.
    pub fn publisher(&self) -> SnapshotPublisher {
        SnapshotPublisher { tx: self.tx.clone() }
    }

    /// Register a plugin. The returned ticket carries the channel name
    /// either way; status 0 means a duplicate name was rejected and no
    /// relay was created.
    pub async fn add_plugin(&self, interval: Duration, name: &str) -> Result<PluginTicket> {
        debug!(%name, "DispatcherFrontend::add_plugin");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(DispatchRequest::Register {
                name: name.to_string(),
                interval,
                reply_tx,
            })
            .await
            .map_err(|_| eyre!("Dispatcher channel closed"))?;

        let status = reply_rx
            .await
            .map_err(|_| eyre!("Dispatcher shutdown before reply"))?;

        Ok(PluginTicket {
            channel_name: channel_name(name, &self.owner_id),
            status,
        })
    }

    /// Tear down a plugin's relay and channel.
    pub async fn remove_plugin(&self, name: &str) -> Result<()> {
        self.tx
            .send(DispatchRequest::Deregister {
                name: name.to_string(),
            })
            .await
            .map_err(|_| eyre!("Dispatcher channel closed"))
    }

    /// Install the command-queue client once the engine hands over its
    /// command region at program load.
    pub fn install_commands(&mut self, region: Arc<CommandRegion>) {
        debug!("DispatcherFrontend::install_commands");
        self.commands = Some(CommandQueueClient::new(region));
    }

    /// Mutable access to the command client; `None` until a program
    /// load delivered the command region.
    pub fn commands(&mut self) -> Option<&mut CommandQueueClient> {
        self.commands.as_mut()
    }

    /// Stop the dispatcher and wait for the relays' final flush.
    pub async fn shutdown(self) -> Result<()> {
        self.tx
            .send(DispatchRequest::Shutdown)
            .await
            .map_err(|_| eyre!("Dispatcher channel closed"))?;
        self.task.await.map_err(|e| eyre!("Dispatcher task panicked: {e}"))
    }
}
