//! Dispatcher configuration

use serde::{Deserialize, Serialize};

/// Dispatcher tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Buffer size for requests to the dispatcher task.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer: usize,

    /// Ring capacity of each plugin's broadcast channel.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

fn default_channel_buffer() -> usize {
    64
}

fn default_bus_capacity() -> usize {
    crate::bus::DEFAULT_CHANNEL_CAPACITY
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_buffer: default_channel_buffer(),
            bus_capacity: default_bus_capacity(),
        }
    }
}
