//! Engine boundary
//!
//! The simulation engine runs in its own task and is consumed only
//! through this narrow message surface: [`EngineCommand`] in,
//! [`EngineEvent`] out. The engine's telemetry does not travel here —
//! it flows through the dispatch tree as snapshots. Only the handshake
//! (boot, loads, start/clear) and the command-region handover do.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::commands::{CommandRegion, PauseGate};
use crate::dispatcher::{RegistrationStatus, SnapshotPublisher};
use crate::store::ParseStatus;

/// Requests from the controller to the engine task.
#[derive(Debug)]
pub enum EngineCommand {
    /// Boot the engine. Carries the shared pause gate the engine parks
    /// on while paused, and the publish handle its telemetry goes out
    /// through.
    Boot {
        server_id: Option<String>,
        pause: Arc<PauseGate>,
        publisher: SnapshotPublisher,
    },

    /// Load engine parameters (ignored while a simulation runs).
    LoadParams { params: Value },

    /// Load the provider (hardware description) pack.
    LoadProvider { data: Value },

    /// Load the user program. On success the engine hands its command
    /// region back over [`EngineEvent::ProgramStatus`].
    LoadProgram { data: Value },

    /// Start the simulation at the given entry point.
    Start { entry: String },

    ClearProvider,
    ClearProgram,
}

/// Replies and signals from the engine task.
#[derive(Debug)]
pub enum EngineEvent {
    /// One-time boot acknowledgement with the engine instance id.
    Ready { instance_id: String },

    /// Plugin registration outcome relayed from the dispatcher side.
    PluginLoaded {
        name: String,
        status: RegistrationStatus,
    },

    /// Provider parse outcome (also broadcast through the relays).
    ProviderStatus(ParseStatus),

    /// Program parse outcome, with the command region handed over on a
    /// successful load.
    ProgramStatus {
        status: ParseStatus,
        commands: Option<Arc<CommandRegion>>,
    },
}

/// Controller-side ends of the engine link.
#[derive(Debug)]
pub struct EngineLink {
    pub commands: mpsc::Sender<EngineCommand>,
    pub events: mpsc::Receiver<EngineEvent>,
}

impl EngineLink {
    /// Create a linked pair: the controller keeps the [`EngineLink`],
    /// the engine task takes the [`EngineEndpoint`].
    pub fn pair(buffer: usize) -> (Self, EngineEndpoint) {
        let (cmd_tx, cmd_rx) = mpsc::channel(buffer);
        let (event_tx, event_rx) = mpsc::channel(buffer);
        (
            Self {
                commands: cmd_tx,
                events: event_rx,
            },
            EngineEndpoint {
                commands: cmd_rx,
                events: event_tx,
            },
        )
    }
}

/// Engine-side ends of the link.
#[derive(Debug)]
pub struct EngineEndpoint {
    pub commands: mpsc::Receiver<EngineCommand>,
    pub events: mpsc::Sender<EngineEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_format_with_debug() {
        // The handover variant carries the command region, which must
        // stay Debug for the derive on EngineEvent to hold.
        let event = EngineEvent::ProgramStatus {
            status: ParseStatus::Loaded,
            commands: Some(Arc::new(CommandRegion::new())),
        };
        let rendered = format!("{event:?}");
        assert!(rendered.contains("ProgramStatus"));
        assert!(rendered.contains("Loaded"));
    }

    #[tokio::test]
    async fn test_link_pair_is_connected() {
        let (mut link, mut endpoint) = EngineLink::pair(8);

        link.commands
            .send(EngineCommand::Start {
                entry: "Main".to_string(),
            })
            .await
            .unwrap();
        let cmd = endpoint.commands.recv().await.unwrap();
        assert!(matches!(cmd, EngineCommand::Start { entry } if entry == "Main"));

        endpoint
            .events
            .send(EngineEvent::Ready {
                instance_id: "abc".to_string(),
            })
            .await
            .unwrap();
        let event = link.events.recv().await.unwrap();
        assert!(matches!(event, EngineEvent::Ready { instance_id } if instance_id == "abc"));
    }
}
