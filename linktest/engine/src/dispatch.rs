//! Per-slot dispatch and deadline checks.

use linktest_core::{LogEvent, OverrunRecord, RoundState, SlotEvent, Tick};
use linktest_hal::TimeAuthority;

use crate::strategy::{ModeStrategy, SlotContext};
use crate::trace::Emitter;

/// Reports an overrun if `deadline` has already passed.
///
/// The schedule is never shifted: the caller still waits on the original
/// deadline, which then returns immediately.
pub fn check_deadline<C: TimeAuthority>(
    clock: &C,
    emitter: &Emitter,
    round: u16,
    slot: Option<u16>,
    deadline: Tick,
) -> Option<OverrunRecord> {
    let now = clock.now();
    if !now.is_after(deadline) {
        return None;
    }
    let record = OverrunRecord {
        round,
        slot,
        late_by: now.saturating_since(deadline).ticks(),
    };
    match slot {
        Some(slot) => log::warn!(
            "round {round}: slot {slot} deadline missed by {} ticks",
            record.late_by
        ),
        None => log::warn!(
            "round {round}: end-of-round deadline missed by {} ticks",
            record.late_by
        ),
    }
    emitter.emit(LogEvent::Overrun(record));
    Some(record)
}

/// Runs `slot` and, unless it is the last one, waits for the next slot
/// deadline. Returns an overrun when the slot action ran past that deadline.
pub fn dispatch<C, M>(
    ctx: &mut SlotContext<'_, C>,
    strategy: &mut M,
    round: &RoundState,
    slot: SlotEvent,
) -> Option<OverrunRecord>
where
    C: TimeAuthority,
    M: ModeStrategy,
{
    log::trace!(
        "round {} slot {} at {} ({:?})",
        round.index,
        slot.index,
        slot.deadline,
        slot.role
    );
    strategy.on_slot(ctx, round, &slot);

    if round.timing.is_last_slot(slot.index) {
        return None;
    }

    let next = slot.index + 1;
    let overrun = check_deadline(
        &*ctx.clock,
        ctx.emitter,
        round.index,
        Some(next),
        round.timing.slot_deadline(round.anchor, next),
    );
    let mut reference = round.anchor;
    ctx.clock
        .delay_until(&mut reference, round.timing.slot_offset(next));
    overrun
}
