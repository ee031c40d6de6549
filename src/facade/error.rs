//! Typed failures for facade operations

use std::time::Duration;

use crate::commands::CommandLogError;
use crate::store::{ParseStatus, SimulationStatus};

/// Why a facade operation settled with a failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FacadeError {
    /// Engine-reported fault, already rendered human-readable.
    #[error("{0}")]
    Engine(String),

    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),

    #[error("provider load rejected with status {0:?}")]
    ProviderRejected(ParseStatus),

    #[error("program load rejected with status {0:?}")]
    ProgramRejected(ParseStatus),

    #[error("unexpected simulation status {0:?}")]
    UnexpectedStatus(SimulationStatus),

    #[error("plugin '{0}' was rejected by the dispatcher")]
    PluginRejected(String),

    #[error("no relay channel subscribed, call attach first")]
    NotAttached,

    #[error("unit test catalogue is empty")]
    NoUnitTests,

    #[error("simulation stopped before all unit tests completed")]
    TestsInterrupted,

    #[error("no command region installed, load a program first")]
    CommandsUnavailable,

    #[error("engine link closed")]
    LinkClosed,

    #[error(transparent)]
    Commands(#[from] CommandLogError),

    #[error("{0}")]
    Internal(String),
}
