//! Schedule arithmetic: every deadline of a round as an offset from its anchor.

use crate::error::PlanError;
use crate::plan::TestPlan;
use crate::time::{Tick, TickDuration};

/// Round-independent timing constants, derived once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTiming {
    pub setup_time: TickDuration,
    pub start_delay: TickDuration,
    pub stop_delay: TickDuration,
    /// Airtime of one slot's action.
    pub slot_time: TickDuration,
    /// `slot_time + slot_gap`
    pub slot_period: TickDuration,
    /// `setup + start + (S-1) * slot_period + slot_time + stop`
    pub round_period: TickDuration,
    pub slots: u16,
}

impl ScheduleTiming {
    pub fn derive(plan: &TestPlan, slot_time: TickDuration) -> Result<Self, PlanError> {
        let slots = plan.slots().max(1);
        let slot_period = slot_time
            .checked_add(plan.slot_gap())
            .ok_or(PlanError::TimingOverflow)?;
        let round_period = plan
            .setup_time()
            .checked_add(plan.start_delay())
            .and_then(|t| t.checked_add(slot_period.checked_mul(u32::from(slots - 1))?))
            .and_then(|t| t.checked_add(slot_time))
            .and_then(|t| t.checked_add(plan.stop_delay()))
            .ok_or(PlanError::TimingOverflow)?;

        Ok(Self {
            setup_time: plan.setup_time(),
            start_delay: plan.start_delay(),
            stop_delay: plan.stop_delay(),
            slot_time,
            slot_period,
            round_period,
            slots,
        })
    }

    /// Offset of the first slot from the round anchor.
    pub fn start_offset(&self) -> TickDuration {
        self.setup_time.saturating_add(self.start_delay)
    }

    /// Offset of slot `slot` from the round anchor.
    pub fn slot_offset(&self, slot: u16) -> TickDuration {
        self.start_offset()
            .saturating_add(self.slot_period.saturating_mul(u32::from(slot)))
    }

    pub fn slot_deadline(&self, anchor: Tick, slot: u16) -> Tick {
        anchor + self.slot_offset(slot)
    }

    pub fn is_last_slot(&self, slot: u16) -> bool {
        slot + 1 >= self.slots
    }

    /// End of the round starting at `anchor`, which is also the next anchor.
    pub fn round_end(&self, anchor: Tick) -> Tick {
        anchor + self.round_period
    }

    /// Time from the first anchor until `rounds` rounds have completed.
    pub fn rounds_duration(&self, rounds: usize) -> u64 {
        u64::from(self.round_period.ticks()).saturating_mul(rounds as u64)
    }
}
