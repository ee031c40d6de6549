//! Engine state data model
//!
//! [`StoreSnapshot`] is the unit of telemetry: one tick's worth of
//! changes, every field optional. [`LiveStore`] is the engine-side
//! accumulation surface projected into snapshots by the frontend.

mod live;
mod snapshot;

pub use live::LiveStore;
pub use snapshot::{
    BreakpointState, BreakpointStatus, EngineFault, MonitorChange, MonitorSchema, ParseStatus,
    SimulationStatus, Stack, StackSection, StoreSnapshot, UnitTest, UnitTestStatus, UnitTestUpdate,
};
