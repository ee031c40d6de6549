//! Wire messages a relay emits on its broadcast channel

use serde::{Deserialize, Serialize};

use crate::store::{
    BreakpointStatus, EngineFault, MonitorChange, MonitorSchema, ParseStatus, SimulationStatus,
    Stack, UnitTest, UnitTestUpdate,
};

/// One tagged message per populated snapshot field.
///
/// The fourteen kinds form a closed set; [`RelayMessage::discriminant`]
/// gives each a stable numeric tag so consumers on the other side of a
/// serialization boundary can route without string matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelayMessage {
    Messages(Vec<String>),
    Warnings(Vec<String>),
    Error(EngineFault),
    MonitorChanges(Vec<MonitorChange>),
    BreakpointStatuses(Vec<BreakpointStatus>),
    UnitTestStatuses(Vec<UnitTestUpdate>),
    MonitorSchemas(Vec<MonitorSchema>),
    Breakpoints(Vec<BreakpointStatus>),
    UnitTests(Vec<UnitTest>),
    Stack(Stack),
    EntryPoints(Vec<String>),
    SimulationStatus(SimulationStatus),
    ProviderParseStatus(ParseStatus),
    ProgramParseStatus(ParseStatus),
}

impl RelayMessage {
    /// Stable numeric tag for this message kind.
    pub fn discriminant(&self) -> u8 {
        match self {
            RelayMessage::Messages(_) => 0,
            RelayMessage::Warnings(_) => 1,
            RelayMessage::Error(_) => 2,
            RelayMessage::MonitorChanges(_) => 3,
            RelayMessage::BreakpointStatuses(_) => 4,
            RelayMessage::UnitTestStatuses(_) => 5,
            RelayMessage::MonitorSchemas(_) => 6,
            RelayMessage::Breakpoints(_) => 7,
            RelayMessage::UnitTests(_) => 8,
            RelayMessage::Stack(_) => 9,
            RelayMessage::EntryPoints(_) => 10,
            RelayMessage::SimulationStatus(_) => 11,
            RelayMessage::ProviderParseStatus(_) => 12,
            RelayMessage::ProgramParseStatus(_) => 13,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminants_are_stable() {
        // Wire contract: these tags must never change.
        assert_eq!(RelayMessage::Messages(vec![]).discriminant(), 0);
        assert_eq!(RelayMessage::Warnings(vec![]).discriminant(), 1);
        assert_eq!(
            RelayMessage::Error(EngineFault {
                error: String::new(),
                sim_stack: None,
                id_stack: None,
            })
            .discriminant(),
            2
        );
        assert_eq!(RelayMessage::MonitorChanges(vec![]).discriminant(), 3);
        assert_eq!(RelayMessage::BreakpointStatuses(vec![]).discriminant(), 4);
        assert_eq!(RelayMessage::UnitTestStatuses(vec![]).discriminant(), 5);
        assert_eq!(RelayMessage::MonitorSchemas(vec![]).discriminant(), 6);
        assert_eq!(RelayMessage::Breakpoints(vec![]).discriminant(), 7);
        assert_eq!(RelayMessage::UnitTests(vec![]).discriminant(), 8);
        assert_eq!(RelayMessage::Stack(Stack::default()).discriminant(), 9);
        assert_eq!(RelayMessage::EntryPoints(vec![]).discriminant(), 10);
        assert_eq!(
            RelayMessage::SimulationStatus(SimulationStatus::Stop).discriminant(),
            11
        );
        assert_eq!(
            RelayMessage::ProviderParseStatus(ParseStatus::Loaded).discriminant(),
            12
        );
        assert_eq!(
            RelayMessage::ProgramParseStatus(ParseStatus::Empty).discriminant(),
            13
        );
    }

    #[test]
    fn test_message_round_trips_through_json() {
        let msg = RelayMessage::UnitTestStatuses(vec![UnitTestUpdate {
            id: 3,
            status: crate::store::UnitTestStatus::Failed,
            fail_message: Some("expected 4, got 5".to_string()),
        }]);

        let json = serde_json::to_string(&msg).unwrap();
        let back: RelayMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
