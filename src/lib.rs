//! SimBridge - Control and telemetry plane for a simulation engine
//!
//! SimBridge sits between a controller and a cyclically-executing
//! simulation engine. Telemetry flows one way: the engine publishes
//! [`store::StoreSnapshot`] batches into a [`dispatcher::Dispatcher`],
//! which fans them out to per-plugin [`relay::PluginRelay`] tasks that
//! coalesce and re-emit them on interval ticks over a broadcast bus.
//! Control flows the other way through a shared, lock-guarded
//! [`commands::CommandRegion`] the engine drains between scan cycles.
//!
//! # Core Concepts
//!
//! - **Snapshots, not streams**: the engine accumulates into a
//!   [`store::LiveStore`] and ships the whole delta at once
//! - **Relays own pacing**: each plugin sees coalesced state at its own
//!   interval, never the engine's raw publish rate
//! - **Single command writer**: one [`commands::CommandQueueClient`]
//!   appends, the engine drains, duplicates are memoized away
//! - **Facade settles operations**: [`facade::ControlClientFacade`]
//!   turns the event flow into awaitable request/response calls
//!
//! # Modules
//!
//! - [`store`] - Snapshot data model and engine-side accumulation
//! - [`bus`] - Named broadcast channel registry
//! - [`relay`] - Wire messages and per-plugin coalescing relays
//! - [`dispatcher`] - Fan-out actor and its controller-side frontend
//! - [`commands`] - Shared command log, dedup client, pause gate
//! - [`engine`] - Command/event link between controller and engine
//! - [`facade`] - Awaitable end-caller operations over the whole plane

pub mod bus;
pub mod commands;
pub mod dispatcher;
pub mod engine;
pub mod facade;
pub mod relay;
pub mod store;

pub use commands::{CommandLogEntry, CommandOpcode, CommandQueueClient, CommandRegion, PauseGate};
pub use dispatcher::{DispatcherConfig, DispatcherFrontend, SnapshotPublisher};
pub use engine::{EngineCommand, EngineEvent, EngineLink};
pub use facade::{ControlClientFacade, FacadeConfig, FacadeError, UnitTestReport};
pub use relay::RelayMessage;
pub use store::{LiveStore, StoreSnapshot};
