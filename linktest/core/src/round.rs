//! Per-round and per-slot state.

use crate::node::{NodeId, NodeRoster};
use crate::schedule::ScheduleTiming;
use crate::time::{Tick, TickDuration};

/// What a node does during the slots of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Transmit,
    Receive,
}

/// Role of `node` in round `round`.
///
/// The node owning the round transmits, everybody else receives. A round
/// outside the roster makes everyone a receiver.
pub fn role_for(roster: &NodeRoster, round: usize, node: NodeId) -> SlotRole {
    match roster.node_for_round(round) {
        Some(active) if active == node => SlotRole::Transmit,
        _ => SlotRole::Receive,
    }
}

/// State of the round currently executing. Created at the top of each round
/// and dropped at its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundState {
    pub index: u16,
    pub active_node: NodeId,
    pub is_local_transmitter: bool,
    /// Start of this round's setup time.
    pub anchor: Tick,
    pub timing: ScheduleTiming,
}

impl RoundState {
    pub fn new(
        roster: &NodeRoster,
        index: u16,
        this_node: NodeId,
        anchor: Tick,
        timing: ScheduleTiming,
    ) -> Option<Self> {
        let active_node = roster.node_for_round(usize::from(index))?;
        Some(Self {
            index,
            active_node,
            is_local_transmitter: active_node == this_node,
            anchor,
            timing,
        })
    }

    pub fn role(&self) -> SlotRole {
        if self.is_local_transmitter {
            SlotRole::Transmit
        } else {
            SlotRole::Receive
        }
    }

    /// Slot `index` of this round with its absolute deadline.
    pub fn slot(&self, index: u16) -> SlotEvent {
        SlotEvent {
            index,
            deadline: self.timing.slot_deadline(self.anchor, index),
            role: self.role(),
        }
    }

    pub fn slot_period(&self) -> TickDuration {
        self.timing.slot_period
    }

    pub fn round_period(&self) -> TickDuration {
        self.timing.round_period
    }

    /// Intended end of the round, which is the anchor of the next one.
    pub fn end(&self) -> Tick {
        self.timing.round_end(self.anchor)
    }
}

/// One slot firing. Computed just in time, never retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEvent {
    pub index: u16,
    pub deadline: Tick,
    pub role: SlotRole,
}
