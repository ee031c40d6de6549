//! Per-consumer relay: merge, batch, flush
//!
//! A relay receives every snapshot the dispatcher fans out, merges it
//! into its accumulator, and flushes one tagged message per populated
//! field over its broadcast channel on its own timer. Differentiation
//! between consumers happens entirely here; the dispatcher above does
//! no filtering.

mod accumulator;
mod core;
mod messages;

pub use accumulator::RelayAccumulator;
pub use core::{PluginRelay, RelayInit, channel_name};
pub use messages::RelayMessage;
