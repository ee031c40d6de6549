//! Engine-side live store and its projection into a transport snapshot
//!
//! The engine accumulates state changes here during a cycle (lazily, as
//! they happen). The frontend drains it once per tick with
//! [`LiveStore::take_snapshot`], which moves only the populated fields
//! into a [`StoreSnapshot`] and resets the store for the next cycle.

use tracing::debug;

use super::snapshot::{
    BreakpointStatus, EngineFault, MonitorChange, MonitorSchema, ParseStatus, SimulationStatus,
    Stack, StoreSnapshot, UnitTest, UnitTestUpdate,
};

/// Mutable state surface the engine writes into between publishes.
#[derive(Debug, Default)]
pub struct LiveStore {
    messages: Vec<String>,
    warnings: Vec<String>,
    error: Option<EngineFault>,
    monitor_changes: Vec<MonitorChange>,
    breakpoint_statuses: Vec<BreakpointStatus>,
    unit_test_statuses: Vec<UnitTestUpdate>,
    monitor_schemas: Option<Vec<MonitorSchema>>,
    breakpoints: Option<Vec<BreakpointStatus>>,
    unit_tests: Option<Vec<UnitTest>>,
    stack: Option<Stack>,
    entry_points: Option<Vec<String>>,
    simulation_status: Option<SimulationStatus>,
    provider_parse_status: Option<ParseStatus>,
    program_parse_status: Option<ParseStatus>,
}

impl LiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    pub fn add_warning(&mut self, warning: &str) {
        self.warnings.push(warning.to_string());
    }

    pub fn set_error(&mut self, fault: EngineFault) {
        self.error = Some(fault);
    }

    pub fn push_monitor_change(&mut self, change: MonitorChange) {
        self.monitor_changes.push(change);
    }

    pub fn push_breakpoint_status(&mut self, status: BreakpointStatus) {
        self.breakpoint_statuses.push(status);
    }

    pub fn push_unit_test_status(&mut self, update: UnitTestUpdate) {
        self.unit_test_statuses.push(update);
    }

    pub fn set_monitor_schemas(&mut self, schemas: Vec<MonitorSchema>) {
        self.monitor_schemas = Some(schemas);
    }

    pub fn set_breakpoints(&mut self, breakpoints: Vec<BreakpointStatus>) {
        self.breakpoints = Some(breakpoints);
    }

    pub fn set_unit_tests(&mut self, unit_tests: Vec<UnitTest>) {
        self.unit_tests = Some(unit_tests);
    }

    pub fn set_stack(&mut self, stack: Stack) {
        self.stack = Some(stack);
    }

    pub fn set_entry_points(&mut self, entry_points: Vec<String>) {
        self.entry_points = Some(entry_points);
    }

    pub fn set_simulation_status(&mut self, status: SimulationStatus) {
        self.simulation_status = Some(status);
    }

    pub fn set_provider_parse_status(&mut self, status: ParseStatus) {
        self.provider_parse_status = Some(status);
    }

    pub fn set_program_parse_status(&mut self, status: ParseStatus) {
        self.program_parse_status = Some(status);
    }

    /// Project the populated fields into a transport snapshot and reset.
    ///
    /// Returns `None` when nothing changed this cycle, so idle ticks
    /// publish nothing.
    pub fn take_snapshot(&mut self) -> Option<StoreSnapshot> {
        let drained = std::mem::take(self);

        let snapshot = StoreSnapshot {
            messages: non_empty(drained.messages),
            warnings: non_empty(drained.warnings),
            error: drained.error,
            monitor_changes: non_empty(drained.monitor_changes),
            breakpoint_statuses: non_empty(drained.breakpoint_statuses),
            unit_test_statuses: non_empty(drained.unit_test_statuses),
            monitor_schemas: drained.monitor_schemas,
            breakpoints: drained.breakpoints,
            unit_tests: drained.unit_tests,
            stack: drained.stack,
            entry_points: drained.entry_points,
            simulation_status: drained.simulation_status,
            provider_parse_status: drained.provider_parse_status,
            program_parse_status: drained.program_parse_status,
        };

        if snapshot.is_empty() {
            None
        } else {
            debug!("LiveStore::take_snapshot: projected populated snapshot");
            Some(snapshot)
        }
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}
