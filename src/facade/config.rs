//! Facade configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Facade tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacadeConfig {
    /// Upper bound on any single request/response wait, in seconds.
    /// Facade waits have no other way to end than an event or this.
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,

    /// Buffer size for the engine command/event link.
    #[serde(default = "default_engine_buffer")]
    pub engine_buffer: usize,
}

fn default_op_timeout_secs() -> u64 {
    30
}

fn default_engine_buffer() -> usize {
    32
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            op_timeout_secs: default_op_timeout_secs(),
            engine_buffer: default_engine_buffer(),
        }
    }
}

impl FacadeConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }
}
