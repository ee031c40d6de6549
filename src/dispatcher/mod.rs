//! Broadcast-dispatch tree root
//!
//! The dispatcher owns the set of per-plugin relays and forwards every
//! snapshot to all of them, unmodified. [`DispatcherFrontend`] is the
//! controller-thread handle over it.

mod config;
mod core;
mod frontend;
mod messages;

pub use config::DispatcherConfig;
pub use core::Dispatcher;
pub use frontend::{DispatcherFrontend, PluginTicket, SnapshotPublisher};
pub use messages::{DispatchRequest, RegistrationStatus};
