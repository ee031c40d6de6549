//! End-caller surface: one struct wrapping boot, loading, run control
//! and unit-test orchestration behind awaitable operations

mod config;
mod core;
mod error;

pub use config::FacadeConfig;
pub use core::{ControlClientFacade, UnitTestReport};
pub use error::FacadeError;
