//! Transport-safe snapshot types crossing the dispatch tree

use std::fmt;

use serde::{Deserialize, Serialize};

/// Run state reported by the simulation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimulationStatus {
    Start,
    Stop,
    Pause,
    #[default]
    Unavailable,
}

/// Outcome of a provider or program parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseStatus {
    #[default]
    Empty,
    Loaded,
}

/// Per-test outcome; `Unreached` until the engine executes the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitTestStatus {
    Unreached,
    Failed,
    Succeed,
}

/// Whether a breakpoint is currently armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakpointState {
    Enabled,
    Disabled,
}

/// A monitored variable's path and its serialized schema value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSchema {
    pub path: Vec<String>,
    pub value: String,
}

/// New serialized value for a monitored variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorChange {
    pub id: u32,
    pub value: String,
}

/// Breakpoint id paired with its armed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointStatus {
    pub id: u32,
    pub state: BreakpointState,
}

/// Unit test as listed in the program catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTest {
    pub id: u32,
    pub description: String,
    pub status: UnitTestStatus,
}

/// Status delta for a single unit test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTestUpdate {
    pub id: u32,
    pub status: UnitTestStatus,
    #[serde(rename = "fail-message", skip_serializing_if = "Option::is_none")]
    pub fail_message: Option<String>,
}

/// Structured failure reported by the engine.
///
/// `sim_stack` holds the simulation call stack at the point of failure,
/// `id_stack` the file/id trace. Both are optional; the `Display` impl
/// renders whatever is present into one human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineFault {
    pub error: String,
    #[serde(rename = "sim-stack", skip_serializing_if = "Option::is_none")]
    pub sim_stack: Option<Vec<String>>,
    #[serde(rename = "id-stack", skip_serializing_if = "Option::is_none")]
    pub id_stack: Option<Vec<String>>,
}

impl fmt::Display for EngineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.error)?;
        if let Some(sim_stack) = &self.sim_stack {
            writeln!(f, "> Simulation stack:")?;
            for frame in sim_stack {
                writeln!(f, "  at -  {frame}")?;
            }
        }
        if let Some(id_stack) = &self.id_stack {
            writeln!(f, "File stack: ")?;
            for frame in id_stack {
                write!(f, "{frame}")?;
            }
        }
        Ok(())
    }
}

/// One named section of the simulation call stack.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StackSection {
    pub name: String,
    pub ty: String,
    pub logs: Vec<String>,
}

/// Simulation call stack as a list of sections, outermost first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stack {
    pub sections: Vec<StackSection>,
}

impl Stack {
    pub fn push(&mut self, name: &str, ty: &str) {
        self.sections.push(StackSection {
            name: name.to_string(),
            ty: ty.to_string(),
            logs: Vec::new(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// One engine tick's worth of state, produced by the frontend projection
/// and consumed exactly once by the dispatcher.
///
/// Every field is optional: `None` means "no change this cycle" and must
/// never be replaced by a synthesized default downstream.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub messages: Option<Vec<String>>,
    pub warnings: Option<Vec<String>>,
    pub error: Option<EngineFault>,
    #[serde(rename = "monitor-changes")]
    pub monitor_changes: Option<Vec<MonitorChange>>,
    #[serde(rename = "breakpoint-statuses")]
    pub breakpoint_statuses: Option<Vec<BreakpointStatus>>,
    #[serde(rename = "unit-test-statuses")]
    pub unit_test_statuses: Option<Vec<UnitTestUpdate>>,
    #[serde(rename = "monitor-schemas")]
    pub monitor_schemas: Option<Vec<MonitorSchema>>,
    pub breakpoints: Option<Vec<BreakpointStatus>>,
    #[serde(rename = "unit-tests")]
    pub unit_tests: Option<Vec<UnitTest>>,
    pub stack: Option<Stack>,
    #[serde(rename = "entry-points")]
    pub entry_points: Option<Vec<String>>,
    #[serde(rename = "simulation-status")]
    pub simulation_status: Option<SimulationStatus>,
    #[serde(rename = "provider-parse-status")]
    pub provider_parse_status: Option<ParseStatus>,
    #[serde(rename = "program-parse-status")]
    pub program_parse_status: Option<ParseStatus>,
}

impl StoreSnapshot {
    /// True when no field carries a change.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
