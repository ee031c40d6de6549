//! Shared command log between controller and engine
//!
//! [`CommandRegion`] is the raw shared log plus its lock-word protocol;
//! [`CommandQueueClient`] is the single-writer producer proxy with
//! idempotent admission; [`PauseGate`] carries the suspend/resume word.

mod client;
mod pause;
mod region;

pub use client::CommandQueueClient;
pub use pause::PauseGate;
pub use region::{
    COMMAND_CAPACITY, CommandLogEntry, CommandLogError, CommandOpcode, CommandRegion,
};
