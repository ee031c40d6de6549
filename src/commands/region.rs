//! Shared command log and its lock-word protocol
//!
//! The region is the only memory shared between the controller and the
//! engine thread. The producer side (one `CommandQueueClient`, §single
//! writer) appends (opcode, operand) pairs; the engine periodically
//! drains the log in two phases: `begin_drain` flips the lock word and
//! returns the pending entries, `finish_drain` zeroes the region and
//! wakes a producer waiting for the drain to end.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::debug;

/// Fixed log capacity in entries (two slots each).
pub const COMMAND_CAPACITY: usize = 128;

const SLOT_COUNT: usize = COMMAND_CAPACITY * 2;

/// Typed failures on the command log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandLogError {
    #[error("command log is full ({COMMAND_CAPACITY} entries)")]
    Full,
}

/// Control operations understood by the engine's drain loop.
///
/// The slot values are the wire contract with the engine and must not
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandOpcode {
    Stop,
    Pause,
    EnableAllBreakpoints,
    DisableAllBreakpoints,
    EnableBreakpoint,
    DisableBreakpoint,
}

impl CommandOpcode {
    pub fn as_slot(self) -> i32 {
        match self {
            CommandOpcode::Stop => 1,
            CommandOpcode::Pause => 2,
            CommandOpcode::EnableAllBreakpoints => 3,
            CommandOpcode::DisableAllBreakpoints => 4,
            CommandOpcode::EnableBreakpoint => 5,
            CommandOpcode::DisableBreakpoint => 6,
        }
    }

    pub fn from_slot(slot: i32) -> Option<Self> {
        match slot {
            1 => Some(CommandOpcode::Stop),
            2 => Some(CommandOpcode::Pause),
            3 => Some(CommandOpcode::EnableAllBreakpoints),
            4 => Some(CommandOpcode::DisableAllBreakpoints),
            5 => Some(CommandOpcode::EnableBreakpoint),
            6 => Some(CommandOpcode::DisableBreakpoint),
            _ => None,
        }
    }
}

/// One decoded log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub opcode: CommandOpcode,
    pub operand: u32,
}

#[derive(Debug)]
struct RegionState {
    slots: Vec<i32>,
    draining: bool,
}

/// The shared log region. Cheap to share behind an `Arc`; the producer
/// proxy and the engine consumer hold clones of the same region.
#[derive(Debug)]
pub struct CommandRegion {
    state: Mutex<RegionState>,
    freed: Notify,
}

impl CommandRegion {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegionState {
                slots: vec![0; SLOT_COUNT],
                draining: false,
            }),
            freed: Notify::new(),
        }
    }

    /// Producer entry point: suspends the calling task (never the OS
    /// thread) until the consumer is not draining, then hands back a
    /// guard holding the region lock.
    ///
    /// The reset-check / append sequence performed under the guard is
    /// only safe for a single producer task; `CommandQueueClient`
    /// enforces that by owning the sole mutable path here.
    pub(crate) async fn producer_lock(&self) -> ProducerGuard<'_> {
        loop {
            // The guard must not live across the await below or the
            // future stops being Send. A drain finishing between the
            // unlock and the await is covered by the permit notify_one
            // stores.
            {
                let guard = self.state.lock().expect("command region lock poisoned");
                if !guard.draining {
                    return ProducerGuard { guard };
                }
            }
            debug!("CommandRegion::producer_lock: waiting for drain to finish");
            self.freed.notified().await;
        }
    }

    /// Consumer phase one: flip the lock word to draining and decode the
    /// pending entries in append order.
    pub fn begin_drain(&self) -> Vec<CommandLogEntry> {
        let mut guard = self.state.lock().expect("command region lock poisoned");
        guard.draining = true;
        decode(&guard.slots)
    }

    /// Consumer phase two: zero the log, return the lock word to free,
    /// and wake a waiting producer. The producer observes the zeroed
    /// first slot as the reset signal on its next append.
    pub fn finish_drain(&self) {
        let mut guard = self.state.lock().expect("command region lock poisoned");
        guard.slots.fill(0);
        guard.draining = false;
        drop(guard);
        self.freed.notify_one();
    }

    /// Non-destructive read of the pending entries.
    pub fn pending(&self) -> Vec<CommandLogEntry> {
        let guard = self.state.lock().expect("command region lock poisoned");
        decode(&guard.slots)
    }
}

impl Default for CommandRegion {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(slots: &[i32]) -> Vec<CommandLogEntry> {
    let mut entries = Vec::new();
    for pair in slots.chunks_exact(2) {
        let Some(opcode) = CommandOpcode::from_slot(pair[0]) else {
            break;
        };
        entries.push(CommandLogEntry {
            opcode,
            operand: pair[1] as u32,
        });
    }
    entries
}

/// Region lock held by the producer for one check-then-append sequence.
pub(crate) struct ProducerGuard<'a> {
    guard: MutexGuard<'a, RegionState>,
}

impl ProducerGuard<'_> {
    /// True when the consumer has fully drained the log since the last
    /// append: the generation slot (first opcode slot) reads zero.
    pub(crate) fn is_reset(&self) -> bool {
        self.guard.slots[0] == 0
    }

    /// Write one entry at the producer's running index.
    pub(crate) fn write(
        &mut self,
        index: usize,
        opcode: CommandOpcode,
        operand: u32,
    ) -> Result<(), CommandLogError> {
        if index + 1 >= SLOT_COUNT {
            return Err(CommandLogError::Full);
        }
        self.guard.slots[index] = opcode.as_slot();
        self.guard.slots[index + 1] = operand as i32;
        Ok(())
    }
}
