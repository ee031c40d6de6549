//! Producer-side command queue proxy

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::region::{CommandLogError, CommandOpcode, CommandRegion};

/// Remembers the log offset of every pending entry so repeated calls
/// before a consumer reset are no-ops: at most one unconsumed entry per
/// singleton opcode and per (keyed opcode, breakpoint id).
#[derive(Debug, Default)]
struct DedupMemory {
    stop: Option<usize>,
    pause: Option<usize>,
    enable_all: Option<usize>,
    disable_all: Option<usize>,
    enable_breakpoint: HashMap<u32, usize>,
    disable_breakpoint: HashMap<u32, usize>,
}

impl DedupMemory {
    fn contains(&self, opcode: CommandOpcode, operand: u32) -> bool {
        match opcode {
            CommandOpcode::Stop => self.stop.is_some(),
            CommandOpcode::Pause => self.pause.is_some(),
            CommandOpcode::EnableAllBreakpoints => self.enable_all.is_some(),
            CommandOpcode::DisableAllBreakpoints => self.disable_all.is_some(),
            CommandOpcode::EnableBreakpoint => self.enable_breakpoint.contains_key(&operand),
            CommandOpcode::DisableBreakpoint => self.disable_breakpoint.contains_key(&operand),
        }
    }

    fn record(&mut self, opcode: CommandOpcode, operand: u32, offset: usize) {
        match opcode {
            CommandOpcode::Stop => self.stop = Some(offset),
            CommandOpcode::Pause => self.pause = Some(offset),
            CommandOpcode::EnableAllBreakpoints => self.enable_all = Some(offset),
            CommandOpcode::DisableAllBreakpoints => self.disable_all = Some(offset),
            CommandOpcode::EnableBreakpoint => {
                self.enable_breakpoint.insert(operand, offset);
            }
            CommandOpcode::DisableBreakpoint => {
                self.disable_breakpoint.insert(operand, offset);
            }
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Producer proxy enqueuing control commands into the shared log.
///
/// Deliberately not `Clone`, and every operation takes `&mut self`: the
/// check-then-append sequence on the region is only safe with a single
/// producer task, so single-writer confinement is enforced by ownership.
pub struct CommandQueueClient {
    region: Arc<CommandRegion>,
    last_index: usize,
    dedup: DedupMemory,
}

impl CommandQueueClient {
    pub fn new(region: Arc<CommandRegion>) -> Self {
        Self {
            region,
            last_index: 0,
            dedup: DedupMemory::default(),
        }
    }

    pub fn region(&self) -> &Arc<CommandRegion> {
        &self.region
    }

    pub async fn stop(&mut self) -> Result<(), CommandLogError> {
        self.enqueue(CommandOpcode::Stop, 0).await
    }

    pub async fn pause(&mut self) -> Result<(), CommandLogError> {
        self.enqueue(CommandOpcode::Pause, 0).await
    }

    pub async fn enable_all_breakpoints(&mut self) -> Result<(), CommandLogError> {
        self.enqueue(CommandOpcode::EnableAllBreakpoints, 0).await
    }

    pub async fn disable_all_breakpoints(&mut self) -> Result<(), CommandLogError> {
        self.enqueue(CommandOpcode::DisableAllBreakpoints, 0).await
    }

    pub async fn enable_breakpoint(&mut self, id: u32) -> Result<(), CommandLogError> {
        self.enqueue(CommandOpcode::EnableBreakpoint, id).await
    }

    pub async fn disable_breakpoint(&mut self, id: u32) -> Result<(), CommandLogError> {
        self.enqueue(CommandOpcode::DisableBreakpoint, id).await
    }

    /// Wait out a drain, apply the reset check, then append unless an
    /// identical entry is already pending.
    async fn enqueue(&mut self, opcode: CommandOpcode, operand: u32) -> Result<(), CommandLogError> {
        let mut guard = self.region.producer_lock().await;

        if guard.is_reset() {
            debug!("CommandQueueClient::enqueue: log drained, resetting index and dedup");
            self.last_index = 0;
            self.dedup.clear();
        }

        if self.dedup.contains(opcode, operand) {
            debug!(?opcode, operand, "CommandQueueClient::enqueue: duplicate, skipped");
            return Ok(());
        }

        guard.write(self.last_index, opcode, operand)?;
        self.dedup.record(opcode, operand, self.last_index);
        self.last_index += 2;
        debug!(?opcode, operand, index = self.last_index - 2, "CommandQueueClient::enqueue: appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::region::CommandLogEntry;
    use proptest::prelude::*;

    fn entries(region: &CommandRegion) -> Vec<(i32, u32)> {
        region
            .pending()
            .iter()
            .map(|e| (e.opcode.as_slot(), e.operand))
            .collect()
    }

    #[tokio::test]
    async fn test_enable_breakpoint_is_idempotent() {
        let region = Arc::new(CommandRegion::new());
        let mut client = CommandQueueClient::new(region.clone());

        client.enable_breakpoint(7).await.unwrap();
        client.enable_breakpoint(7).await.unwrap();

        assert_eq!(entries(&region), vec![(5, 7)]);
    }

    #[tokio::test]
    async fn test_distinct_opcodes_for_same_id_are_not_deduped() {
        let region = Arc::new(CommandRegion::new());
        let mut client = CommandQueueClient::new(region.clone());

        client.enable_breakpoint(7).await.unwrap();
        client.disable_breakpoint(7).await.unwrap();

        assert_eq!(entries(&region), vec![(5, 7), (6, 7)]);
    }

    #[tokio::test]
    async fn test_singleton_opcodes_coexist() {
        let region = Arc::new(CommandRegion::new());
        let mut client = CommandQueueClient::new(region.clone());

        client.stop().await.unwrap();
        client.pause().await.unwrap();
        client.stop().await.unwrap();

        // Stop and Pause both pending, in append order, no special
        // precedence: the consumer executes them in order at drain time.
        assert_eq!(entries(&region), vec![(1, 0), (2, 0)]);
    }

    #[tokio::test]
    async fn test_operations_run_from_a_spawned_task() {
        let region = Arc::new(CommandRegion::new());

        // tokio::spawn requires the enqueue futures to be Send.
        let producer = {
            let region = region.clone();
            tokio::spawn(async move {
                let mut client = CommandQueueClient::new(region);
                client.stop().await.unwrap();
                client.pause().await.unwrap();
            })
        };
        producer.await.unwrap();

        assert_eq!(entries(&region), vec![(1, 0), (2, 0)]);
    }

    #[tokio::test]
    async fn test_reset_rearms_the_dedup_memory() {
        let region = Arc::new(CommandRegion::new());
        let mut client = CommandQueueClient::new(region.clone());

        client.enable_breakpoint(7).await.unwrap();

        // Simulated consumer: drain and clear.
        let drained = region.begin_drain();
        assert_eq!(
            drained,
            vec![CommandLogEntry {
                opcode: CommandOpcode::EnableBreakpoint,
                operand: 7,
            }]
        );
        region.finish_drain();

        // Same command goes through again after the reset.
        client.enable_breakpoint(7).await.unwrap();
        assert_eq!(entries(&region), vec![(5, 7)]);
    }

    proptest! {
        // Any command sequence leaves at most one pending entry per
        // (opcode, operand) key, in first-arrival order.
        #[test]
        fn prop_no_duplicate_pending_entries(ops in prop::collection::vec((1..=6i32, 0..8u32), 0..64)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let pending = rt.block_on(async {
                let region = Arc::new(CommandRegion::new());
                let mut client = CommandQueueClient::new(region.clone());

                for (op, id) in &ops {
                    let opcode = CommandOpcode::from_slot(*op).unwrap();
                    client.enqueue(opcode, *id).await.unwrap();
                }

                region.pending()
            });

            let mut seen = std::collections::HashSet::new();
            for entry in &pending {
                // Singleton opcodes key on the opcode alone.
                let key = match entry.opcode {
                    CommandOpcode::EnableBreakpoint | CommandOpcode::DisableBreakpoint => {
                        (entry.opcode, entry.operand)
                    }
                    other => (other, 0),
                };
                prop_assert!(seen.insert(key), "duplicate pending entry {:?}", key);
            }
        }
    }
}
