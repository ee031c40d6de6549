//! Per-relay merge/batch state between flush ticks

use crate::store::{BreakpointStatus, StoreSnapshot, UnitTestUpdate};

use super::messages::RelayMessage;

/// Accumulates snapshots between two flush ticks.
///
/// Latest-value fields overwrite field-wise: a field present in a later
/// snapshot supersedes the earlier value, a field absent from a later
/// snapshot leaves the earlier value in place. Breakpoint- and
/// unit-test-status deltas are appended to backlogs instead and are
/// never dropped between ticks.
#[derive(Debug, Default)]
pub struct RelayAccumulator {
    latest: StoreSnapshot,
    breakpoint_status_backlog: Vec<BreakpointStatus>,
    unit_test_status_backlog: Vec<UnitTestUpdate>,
}

impl RelayAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one incoming snapshot, field by field.
    pub fn merge(&mut self, snapshot: StoreSnapshot) {
        if let Some(statuses) = snapshot.breakpoint_statuses {
            self.breakpoint_status_backlog.extend(statuses);
        }
        if let Some(statuses) = snapshot.unit_test_statuses {
            self.unit_test_status_backlog.extend(statuses);
        }

        let latest = &mut self.latest;
        merge_field(&mut latest.messages, snapshot.messages);
        merge_field(&mut latest.warnings, snapshot.warnings);
        merge_field(&mut latest.error, snapshot.error);
        merge_field(&mut latest.monitor_changes, snapshot.monitor_changes);
        merge_field(&mut latest.monitor_schemas, snapshot.monitor_schemas);
        merge_field(&mut latest.breakpoints, snapshot.breakpoints);
        merge_field(&mut latest.unit_tests, snapshot.unit_tests);
        merge_field(&mut latest.stack, snapshot.stack);
        merge_field(&mut latest.entry_points, snapshot.entry_points);
        merge_field(&mut latest.simulation_status, snapshot.simulation_status);
        merge_field(
            &mut latest.provider_parse_status,
            snapshot.provider_parse_status,
        );
        merge_field(
            &mut latest.program_parse_status,
            snapshot.program_parse_status,
        );
    }

    /// True when a flush tick would emit nothing.
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
            && self.breakpoint_status_backlog.is_empty()
            && self.unit_test_status_backlog.is_empty()
    }

    /// Atomically take the accumulated state and build the flush batch,
    /// one tagged message per populated field, in the fixed wire order.
    pub fn drain(&mut self) -> Vec<RelayMessage> {
        let latest = std::mem::take(&mut self.latest);
        let breakpoint_backlog = std::mem::take(&mut self.breakpoint_status_backlog);
        let unit_test_backlog = std::mem::take(&mut self.unit_test_status_backlog);

        let mut batch = Vec::new();
        if let Some(messages) = latest.messages {
            batch.push(RelayMessage::Messages(messages));
        }
        if let Some(warnings) = latest.warnings {
            batch.push(RelayMessage::Warnings(warnings));
        }
        if let Some(error) = latest.error {
            batch.push(RelayMessage::Error(error));
        }
        if let Some(changes) = latest.monitor_changes {
            batch.push(RelayMessage::MonitorChanges(changes));
        }
        if !breakpoint_backlog.is_empty() {
            batch.push(RelayMessage::BreakpointStatuses(breakpoint_backlog));
        }
        if !unit_test_backlog.is_empty() {
            batch.push(RelayMessage::UnitTestStatuses(unit_test_backlog));
        }
        if let Some(schemas) = latest.monitor_schemas {
            batch.push(RelayMessage::MonitorSchemas(schemas));
        }
        if let Some(breakpoints) = latest.breakpoints {
            batch.push(RelayMessage::Breakpoints(breakpoints));
        }
        if let Some(unit_tests) = latest.unit_tests {
            batch.push(RelayMessage::UnitTests(unit_tests));
        }
        if let Some(stack) = latest.stack {
            batch.push(RelayMessage::Stack(stack));
        }
        if let Some(entries) = latest.entry_points {
            batch.push(RelayMessage::EntryPoints(entries));
        }
        if let Some(status) = latest.simulation_status {
            batch.push(RelayMessage::SimulationStatus(status));
        }
        if let Some(status) = latest.provider_parse_status {
            batch.push(RelayMessage::ProviderParseStatus(status));
        }
        if let Some(status) = latest.program_parse_status {
            batch.push(RelayMessage::ProgramParseStatus(status));
        }
        batch
    }
}

fn merge_field<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}
