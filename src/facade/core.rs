//! Request/response bridging over engine events and relay messages
//!
//! Every operation follows the same shape: issue the intent (engine
//! command or command-log entry), then suspend until a predicate over
//! incoming events settles it, bounded by the configured timeout.
//! Catalogue listings (unit tests, schemas, breakpoints) and the
//! command-region handover are absorbed as they flow past any wait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::commands::PauseGate;
use crate::dispatcher::{
    DispatcherConfig, DispatcherFrontend, RegistrationStatus, SnapshotPublisher,
};
use crate::engine::{EngineCommand, EngineEvent, EngineLink};
use crate::relay::RelayMessage;
use crate::store::{
    BreakpointStatus, MonitorSchema, ParseStatus, SimulationStatus, UnitTest, UnitTestStatus,
};

use super::config::FacadeConfig;
use super::error::FacadeError;

/// Settled outcome of one unit test.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTestReport {
    pub id: u32,
    pub description: String,
    pub status: UnitTestStatus,
    pub fail_message: Option<String>,
}

enum Incoming {
    Engine(EngineEvent),
    Relay(RelayMessage),
}

/// End-caller bridge over the command queue and relay-delivered events.
pub struct ControlClientFacade {
    config: FacadeConfig,
    frontend: DispatcherFrontend,
    engine: EngineLink,
    pause: Arc<PauseGate>,
    relay_rx: Option<broadcast::Receiver<RelayMessage>>,
    instance_id: Option<String>,
    unit_tests: Vec<UnitTest>,
    monitor_schemas: Vec<MonitorSchema>,
    breakpoints: Vec<BreakpointStatus>,
}

impl ControlClientFacade {
    /// Build the facade over an engine link. The dispatcher is spawned
    /// here, keyed by a fresh owner id the engine adopts at boot.
    pub fn new(engine: EngineLink, config: FacadeConfig) -> Self {
        let owner_id = Uuid::now_v7().to_string();
        let frontend = DispatcherFrontend::spawn(&owner_id, DispatcherConfig::default());
        Self {
            config,
            frontend,
            engine,
            pause: Arc::new(PauseGate::new()),
            relay_rx: None,
            instance_id: None,
            unit_tests: Vec::new(),
            monitor_schemas: Vec::new(),
            breakpoints: Vec::new(),
        }
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn unit_tests(&self) -> &[UnitTest] {
        &self.unit_tests
    }

    pub fn monitor_schemas(&self) -> &[MonitorSchema] {
        &self.monitor_schemas
    }

    pub fn breakpoints(&self) -> &[BreakpointStatus] {
        &self.breakpoints
    }

    /// Publish handle for wiring up the engine side by hand; normally
    /// the engine receives it inside [`EngineCommand::Boot`].
    pub fn publisher(&self) -> SnapshotPublisher {
        self.frontend.publisher()
    }

    /// Boot the engine and wait for the one-time ready signal carrying
    /// the instance id.
    pub async fn boot(&mut self) -> Result<String, FacadeError> {
        let owner_id = self.frontend.owner_id().to_string();
        debug!(%owner_id, "ControlClientFacade::boot");
        self.send_engine(EngineCommand::Boot {
            server_id: Some(owner_id),
            pause: self.pause.clone(),
            publisher: self.frontend.publisher(),
        })
        .await?;

        let timeout = self.config.op_timeout();
        let instance_id = tokio::time::timeout(timeout, async {
            loop {
                if let Incoming::Engine(EngineEvent::Ready { instance_id }) =
                    self.next_incoming().await?
                {
                    return Ok::<_, FacadeError>(instance_id);
                }
            }
        })
        .await
        .map_err(|_| FacadeError::Timeout(timeout, "engine boot"))??;

        info!(%instance_id, "Engine booted");
        self.instance_id = Some(instance_id.clone());
        Ok(instance_id)
    }

    /// Register this client's own plugin and subscribe to its channel.
    /// Returns the channel name.
    pub async fn attach(&mut self, name: &str, interval: Duration) -> Result<String, FacadeError> {
        let ticket = self
            .frontend
            .add_plugin(interval, name)
            .await
            .map_err(|e| FacadeError::Internal(e.to_string()))?;

        if ticket.status == RegistrationStatus::Rejected {
            return Err(FacadeError::PluginRejected(name.to_string()));
        }

        self.relay_rx = Some(self.frontend.bus().subscribe(&ticket.channel_name));
        info!(channel = %ticket.channel_name, "Facade attached to relay channel");
        Ok(ticket.channel_name)
    }

    /// Fire-and-forget engine parameter load.
    pub async fn load_params(&mut self, params: Value) -> Result<(), FacadeError> {
        self.send_engine(EngineCommand::LoadParams { params }).await
    }

    /// Load the provider pack; settles on the provider parse status.
    pub async fn load_provider(&mut self, data: Value) -> Result<(), FacadeError> {
        self.ensure_attached()?;
        self.send_engine(EngineCommand::LoadProvider { data }).await?;

        let status = self
            .wait_for("provider parse status", |incoming| match incoming {
                Incoming::Relay(RelayMessage::ProviderParseStatus(status)) => Some(*status),
                _ => None,
            })
            .await?;

        match status {
            ParseStatus::Loaded => Ok(()),
            other => Err(FacadeError::ProviderRejected(other)),
        }
    }

    /// Load the user program; settles on the program parse status and
    /// absorbs the command-region handover on the way.
    pub async fn load_program(&mut self, data: Value) -> Result<(), FacadeError> {
        self.ensure_attached()?;
        self.send_engine(EngineCommand::LoadProgram { data }).await?;

        let status = self
            .wait_for("program parse status", |incoming| match incoming {
                Incoming::Relay(RelayMessage::ProgramParseStatus(status)) => Some(*status),
                _ => None,
            })
            .await?;

        match status {
            ParseStatus::Loaded => Ok(()),
            other => Err(FacadeError::ProgramRejected(other)),
        }
    }

    /// Start the simulation and wait for the run to complete (the
    /// engine reports Stop when it finishes).
    pub async fn start(&mut self, entry: &str) -> Result<(), FacadeError> {
        self.ensure_attached()?;
        self.send_engine(EngineCommand::Start {
            entry: entry.to_string(),
        })
        .await?;

        let status = self
            .wait_for("run completion", |incoming| match incoming {
                // Start and Pause are expected along the way.
                Incoming::Relay(RelayMessage::SimulationStatus(
                    SimulationStatus::Start | SimulationStatus::Pause,
                )) => None,
                Incoming::Relay(RelayMessage::SimulationStatus(status)) => Some(*status),
                _ => None,
            })
            .await?;

        match status {
            SimulationStatus::Stop => Ok(()),
            other => Err(FacadeError::UnexpectedStatus(other)),
        }
    }

    /// Enqueue a stop, wake a possibly-paused engine, and wait for the
    /// stopped status.
    pub async fn stop(&mut self) -> Result<(), FacadeError> {
        self.ensure_attached()?;
        let commands = self
            .frontend
            .commands()
            .ok_or(FacadeError::CommandsUnavailable)?;
        commands.stop().await?;
        self.pause.resume();

        let status = self
            .wait_for("stopped status", |incoming| match incoming {
                Incoming::Relay(RelayMessage::SimulationStatus(status)) => Some(*status),
                _ => None,
            })
            .await?;

        match status {
            SimulationStatus::Stop => Ok(()),
            other => Err(FacadeError::UnexpectedStatus(other)),
        }
    }

    /// Enqueue a pause and wait for the paused status.
    pub async fn pause(&mut self) -> Result<(), FacadeError> {
        self.ensure_attached()?;
        let commands = self
            .frontend
            .commands()
            .ok_or(FacadeError::CommandsUnavailable)?;
        commands.pause().await?;

        let status = self
            .wait_for("paused status", |incoming| match incoming {
                Incoming::Relay(RelayMessage::SimulationStatus(status)) => Some(*status),
                _ => None,
            })
            .await?;

        match status {
            SimulationStatus::Pause => Ok(()),
            other => Err(FacadeError::UnexpectedStatus(other)),
        }
    }

    /// Wake a paused engine without stopping it.
    pub fn resume(&self) {
        self.pause.resume();
    }

    pub async fn enable_breakpoint(&mut self, id: u32) -> Result<(), FacadeError> {
        let commands = self
            .frontend
            .commands()
            .ok_or(FacadeError::CommandsUnavailable)?;
        Ok(commands.enable_breakpoint(id).await?)
    }

    pub async fn disable_breakpoint(&mut self, id: u32) -> Result<(), FacadeError> {
        let commands = self
            .frontend
            .commands()
            .ok_or(FacadeError::CommandsUnavailable)?;
        Ok(commands.disable_breakpoint(id).await?)
    }

    pub async fn enable_all_breakpoints(&mut self) -> Result<(), FacadeError> {
        let commands = self
            .frontend
            .commands()
            .ok_or(FacadeError::CommandsUnavailable)?;
        Ok(commands.enable_all_breakpoints().await?)
    }

    pub async fn disable_all_breakpoints(&mut self) -> Result<(), FacadeError> {
        let commands = self
            .frontend
            .commands()
            .ok_or(FacadeError::CommandsUnavailable)?;
        Ok(commands.disable_all_breakpoints().await?)
    }

    /// Clear the provider; settles on the next provider parse status,
    /// whatever it is.
    pub async fn clear_provider(&mut self) -> Result<(), FacadeError> {
        self.ensure_attached()?;
        self.send_engine(EngineCommand::ClearProvider).await?;
        self.wait_for("provider cleared", |incoming| match incoming {
            Incoming::Relay(RelayMessage::ProviderParseStatus(_)) => Some(()),
            _ => None,
        })
        .await
    }

    /// Clear the program; settles on the next program parse status.
    /// An Empty status resets the cached catalogues on the way past.
    pub async fn clear_program(&mut self) -> Result<(), FacadeError> {
        self.ensure_attached()?;
        self.send_engine(EngineCommand::ClearProgram).await?;
        self.wait_for("program cleared", |incoming| match incoming {
            Incoming::Relay(RelayMessage::ProgramParseStatus(_)) => Some(()),
            _ => None,
        })
        .await
    }

    /// Start the run once and settle every catalogued unit test from
    /// its status event. The whole operation fails if the simulation
    /// stops before all tests have settled.
    pub async fn run_unit_tests(&mut self, entry: &str) -> Result<Vec<UnitTestReport>, FacadeError> {
        self.ensure_attached()?;
        if self.unit_tests.is_empty() {
            return Err(FacadeError::NoUnitTests);
        }

        let mut pending: HashMap<u32, String> = self
            .unit_tests
            .iter()
            .map(|t| (t.id, t.description.clone()))
            .collect();
        let mut reports = Vec::with_capacity(pending.len());

        self.send_engine(EngineCommand::Start {
            entry: entry.to_string(),
        })
        .await?;

        let timeout = self.config.op_timeout();
        tokio::time::timeout(timeout, async {
            loop {
                match self.next_incoming().await? {
                    Incoming::Relay(RelayMessage::UnitTestStatuses(updates)) => {
                        for update in updates {
                            let Some(description) = pending.remove(&update.id) else {
                                continue;
                            };
                            reports.push(UnitTestReport {
                                id: update.id,
                                description,
                                status: update.status,
                                fail_message: update.fail_message,
                            });
                        }
                        if pending.is_empty() {
                            return Ok(());
                        }
                    }
                    Incoming::Relay(RelayMessage::SimulationStatus(SimulationStatus::Stop)) => {
                        return Err(FacadeError::TestsInterrupted);
                    }
                    Incoming::Relay(RelayMessage::Error(fault)) => {
                        return Err(FacadeError::Engine(fault.to_string()));
                    }
                    _ => {}
                }
            }
        })
        .await
        .map_err(|_| FacadeError::Timeout(timeout, "unit test run"))??;

        Ok(reports)
    }

    /// Tear down the dispatch tree.
    pub async fn shutdown(self) -> Result<(), FacadeError> {
        self.frontend
            .shutdown()
            .await
            .map_err(|e| FacadeError::Internal(e.to_string()))
    }

    /// Operations settled by relay messages can only time out without a
    /// subscription, so they fail fast instead.
    fn ensure_attached(&self) -> Result<(), FacadeError> {
        if self.relay_rx.is_none() {
            return Err(FacadeError::NotAttached);
        }
        Ok(())
    }

    async fn send_engine(&mut self, command: EngineCommand) -> Result<(), FacadeError> {
        self.engine
            .commands
            .send(command)
            .await
            .map_err(|_| FacadeError::LinkClosed)
    }

    /// Suspend until `settle` matches an incoming event, bounded by the
    /// operation timeout. Engine faults fail the wait immediately.
    async fn wait_for<T>(
        &mut self,
        what: &'static str,
        mut settle: impl FnMut(&Incoming) -> Option<T>,
    ) -> Result<T, FacadeError> {
        let timeout = self.config.op_timeout();
        tokio::time::timeout(timeout, async {
            loop {
                let incoming = self.next_incoming().await?;
                if let Incoming::Relay(RelayMessage::Error(fault)) = &incoming {
                    return Err(FacadeError::Engine(fault.to_string()));
                }
                if let Some(settled) = settle(&incoming) {
                    return Ok(settled);
                }
            }
        })
        .await
        .map_err(|_| FacadeError::Timeout(timeout, what))?
    }

    /// Receive the next engine event or relay message, absorbing
    /// catalogue updates and the command-region handover on the way.
    async fn next_incoming(&mut self) -> Result<Incoming, FacadeError> {
        loop {
            let incoming = match self.relay_rx.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        event = self.engine.events.recv() => {
                            Incoming::Engine(event.ok_or(FacadeError::LinkClosed)?)
                        }
                        msg = rx.recv() => match msg {
                            Ok(msg) => Incoming::Relay(msg),
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(skipped, "Facade lagged behind its relay channel");
                                continue;
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                return Err(FacadeError::LinkClosed);
                            }
                        },
                    }
                }
                None => Incoming::Engine(
                    self.engine
                        .events
                        .recv()
                        .await
                        .ok_or(FacadeError::LinkClosed)?,
                ),
            };

            self.absorb(&incoming);
            return Ok(incoming);
        }
    }

    fn absorb(&mut self, incoming: &Incoming) {
        match incoming {
            Incoming::Engine(EngineEvent::ProgramStatus {
                commands: Some(region),
                ..
            }) => {
                self.frontend.install_commands(region.clone());
            }
            Incoming::Relay(RelayMessage::UnitTests(list)) => {
                self.unit_tests = list.clone();
            }
            Incoming::Relay(RelayMessage::MonitorSchemas(list)) => {
                self.monitor_schemas = list.clone();
            }
            Incoming::Relay(RelayMessage::Breakpoints(list)) => {
                self.breakpoints = list.clone();
            }
            Incoming::Relay(RelayMessage::ProgramParseStatus(ParseStatus::Empty)) => {
                debug!("Program cleared, resetting cached catalogues");
                self.unit_tests.clear();
                self.monitor_schemas.clear();
                self.breakpoints.clear();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineEndpoint;

    fn facade_with_endpoint() -> (ControlClientFacade, EngineEndpoint) {
        let config = FacadeConfig {
            op_timeout_secs: 2,
            ..Default::default()
        };
        let (link, endpoint) = EngineLink::pair(config.engine_buffer);
        (ControlClientFacade::new(link, config), endpoint)
    }

    #[tokio::test]
    async fn test_boot_returns_instance_id() {
        let (mut facade, mut endpoint) = facade_with_endpoint();

        let engine = tokio::spawn(async move {
            let cmd = endpoint.commands.recv().await.unwrap();
            let EngineCommand::Boot { server_id, .. } = cmd else {
                panic!("expected boot");
            };
            endpoint
                .events
                .send(EngineEvent::Ready {
                    instance_id: server_id.unwrap(),
                })
                .await
                .unwrap();
        });

        let id = facade.boot().await.unwrap();
        assert_eq!(facade.instance_id(), Some(id.as_str()));
        engine.await.unwrap();
    }

    #[tokio::test]
    async fn test_boot_times_out_when_signal_never_fires() {
        let config = FacadeConfig {
            op_timeout_secs: 1,
            ..Default::default()
        };
        let (link, _endpoint) = EngineLink::pair(8);
        let mut facade = ControlClientFacade::new(link, config);

        let err = facade.boot().await.unwrap_err();
        assert!(matches!(err, FacadeError::Timeout(_, "engine boot")));
    }

    #[tokio::test]
    async fn test_run_unit_tests_requires_a_catalogue() {
        let (mut facade, _endpoint) = facade_with_endpoint();
        facade
            .attach("client", Duration::from_millis(10))
            .await
            .unwrap();
        let err = facade.run_unit_tests("Main").await.unwrap_err();
        assert_eq!(err, FacadeError::NoUnitTests);
    }

    #[tokio::test]
    async fn test_stop_requires_command_region() {
        let (mut facade, _endpoint) = facade_with_endpoint();
        facade
            .attach("client", Duration::from_millis(10))
            .await
            .unwrap();
        let err = facade.stop().await.unwrap_err();
        assert_eq!(err, FacadeError::CommandsUnavailable);
    }

    #[tokio::test]
    async fn test_relay_settled_operations_fail_fast_before_attach() {
        let (mut facade, _endpoint) = facade_with_endpoint();

        // No subscription, no way to observe a settling message: these
        // must fail immediately instead of waiting out the timeout.
        let err = facade.load_provider(serde_json::json!({})).await.unwrap_err();
        assert_eq!(err, FacadeError::NotAttached);
        let err = facade.start("Main").await.unwrap_err();
        assert_eq!(err, FacadeError::NotAttached);
        let err = facade.stop().await.unwrap_err();
        assert_eq!(err, FacadeError::NotAttached);
        let err = facade.clear_program().await.unwrap_err();
        assert_eq!(err, FacadeError::NotAttached);
        let err = facade.run_unit_tests("Main").await.unwrap_err();
        assert_eq!(err, FacadeError::NotAttached);
    }

    #[tokio::test]
    async fn test_duplicate_attach_is_rejected() {
        let (mut facade, _endpoint) = facade_with_endpoint();

        let channel = facade
            .attach("client", Duration::from_millis(10))
            .await
            .unwrap();
        assert!(channel.starts_with("client__"));

        let err = facade
            .attach("client", Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err, FacadeError::PluginRejected("client".to_string()));
    }
}
