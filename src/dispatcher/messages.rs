//! Request types for the dispatcher task

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::store::StoreSnapshot;

/// Outcome of a plugin registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    /// Name already taken; nothing was created.
    Rejected,
    Accepted,
}

impl RegistrationStatus {
    /// Wire code: 0 rejected, 1 accepted.
    pub fn as_code(self) -> u8 {
        match self {
            RegistrationStatus::Rejected => 0,
            RegistrationStatus::Accepted => 1,
        }
    }
}

/// Internal requests to the dispatcher task.
#[derive(Debug)]
pub enum DispatchRequest {
    /// Register a plugin and spawn its relay.
    Register {
        name: String,
        interval: Duration,
        reply_tx: oneshot::Sender<RegistrationStatus>,
    },

    /// Tear down a plugin's relay and bus channel.
    Deregister { name: String },

    /// Fan a snapshot out to every registered relay.
    Publish { snapshot: StoreSnapshot },

    /// Stop the dispatcher; relays wind down as their feeds close.
    Shutdown,
}
