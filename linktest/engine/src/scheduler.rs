//! Round scheduler.
//!
//! Lifecycle of a run:
//!
//! 1. Emit `TestConfig` and the mode's configuration record.
//! 2. Prepare the mode strategy and derive the schedule timing.
//! 3. Poll the synchronization input every tick until it is asserted.
//! 4. Read the clock once: that tick is the first anchor.
//! 5. For every round of the roster run setup, start delay, slots and stop
//!    delay, then advance the anchor by exactly one round period.
//! 6. Emit a long terminal pulse and blink a heartbeat forever.
//!
//! Every wait is an absolute `delay_until` from the round anchor, so time
//! spent in logging or radio calls never accumulates into drift.

use alloc::vec::Vec;
use core::convert::Infallible;

use linktest_core::{
    LogEvent, NodeId, OverrunRecord, RoundMarker, RoundState, ScheduleTiming, TestPlan, Tick,
    TickDuration,
};
use linktest_hal::{Level, NoPin, SignalPin, SyncInput, TimeAuthority};

use crate::dispatch::{check_deadline, dispatch};
use crate::error::EngineError;
use crate::strategy::{ModeStrategy, SlotContext};
use crate::trace::{Emitter, EventHook};

pub const SYNC_POLL_INTERVAL: TickDuration = TickDuration::from_ticks(1);
pub const ROUND_PULSE: TickDuration = TickDuration::from_ticks(1);
pub const TERMINAL_PULSE: TickDuration = TickDuration::from_millis(500);
pub const HEARTBEAT_PULSE: TickDuration = TickDuration::from_millis(1);
pub const HEARTBEAT_PERIOD: TickDuration = TickDuration::from_millis(1000);

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub timing: ScheduleTiming,
    /// Anchor of every executed round.
    pub anchors: Vec<Tick>,
    pub overruns: Vec<OverrunRecord>,
}

impl RunReport {
    pub fn rounds(&self) -> usize {
        self.anchors.len()
    }
}

/// Drives one node through a test plan.
pub struct RoundScheduler<C, S, M, P = NoPin> {
    plan: TestPlan,
    node: NodeId,
    clock: C,
    sync: S,
    mode: M,
    round_pin: P,
    slot_pin: P,
    emitter: Emitter,
}

impl<C, S, M> RoundScheduler<C, S, M, NoPin>
where
    C: TimeAuthority,
    S: SyncInput,
    M: ModeStrategy,
{
    pub fn new(plan: TestPlan, node: NodeId, mode: M, clock: C, sync: S) -> Self {
        Self {
            plan,
            node,
            clock,
            sync,
            mode,
            round_pin: NoPin,
            slot_pin: NoPin,
            emitter: Emitter::silent(),
        }
    }
}

impl<C, S, M, P> RoundScheduler<C, S, M, P>
where
    C: TimeAuthority,
    S: SyncInput,
    M: ModeStrategy,
    P: SignalPin,
{
    /// Attaches instrumentation outputs pulsed at round and slot boundaries.
    pub fn with_pins<Q: SignalPin>(self, round_pin: Q, slot_pin: Q) -> RoundScheduler<C, S, M, Q> {
        RoundScheduler {
            plan: self.plan,
            node: self.node,
            clock: self.clock,
            sync: self.sync,
            mode: self.mode,
            round_pin,
            slot_pin,
            emitter: self.emitter,
        }
    }

    pub fn with_emitter(mut self, emitter: Emitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn with_hook(self, hook: EventHook) -> Self {
        self.with_emitter(Emitter::new(hook))
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn plan(&self) -> &TestPlan {
        &self.plan
    }

    pub fn mode(&self) -> &M {
        &self.mode
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Runs all rounds, then the heartbeat. Only returns on a configuration
    /// error, which is always detected before the synchronization wait.
    pub fn run(mut self) -> Result<Infallible, EngineError> {
        let report = self.run_rounds()?;
        log::info!(
            "node {}: {} rounds done, {} overruns",
            self.node,
            report.rounds(),
            report.overruns.len()
        );
        self.heartbeat()
    }

    /// Steps 1 to 5 of the lifecycle.
    pub fn run_rounds(&mut self) -> Result<RunReport, EngineError> {
        let timing = self.prepare()?;
        self.wait_for_sync();

        let mut anchor = self.clock.now();
        log::info!("node {} synchronized at {anchor}", self.node);

        let mut report = RunReport {
            timing,
            anchors: Vec::with_capacity(self.plan.rounds()),
            overruns: Vec::new(),
        };
        for index in 0..self.plan.rounds() {
            let Some(round) =
                RoundState::new(self.plan.roster(), index as u16, self.node, anchor, timing)
            else {
                break;
            };
            report.anchors.push(anchor);
            anchor = self.run_round(&round, &mut report.overruns);
        }
        Ok(report)
    }

    fn prepare(&mut self) -> Result<ScheduleTiming, EngineError> {
        self.emitter.emit(LogEvent::TestConfig((&self.plan).into()));
        self.emitter.emit(self.mode.config_event());

        let mut ctx = SlotContext {
            clock: &mut self.clock,
            emitter: &self.emitter,
            node: self.node,
        };
        let slot_time = self.mode.prepare(&mut ctx)?;
        let timing = ScheduleTiming::derive(&self.plan, slot_time)?;
        log::info!(
            "{} mode, {} rounds of {} slots, slot period {}, round period {}",
            self.mode.mode(),
            self.plan.rounds(),
            timing.slots,
            timing.slot_period,
            timing.round_period
        );
        Ok(timing)
    }

    fn wait_for_sync(&mut self) {
        log::debug!("node {} waiting for sync", self.node);
        loop {
            match self.sync.poll() {
                Ok(()) => return,
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(err)) => log::warn!("sync input: {err}"),
            }
            self.clock.delay(SYNC_POLL_INTERVAL);
        }
    }

    /// Executes one round and returns the next anchor.
    fn run_round(&mut self, round: &RoundState, overruns: &mut Vec<OverrunRecord>) -> Tick {
        let timing = round.timing;
        let marker = RoundMarker {
            round: round.index,
            node: round.active_node,
        };

        self.pulse_round();
        let mut reference = round.anchor;
        self.clock.delay_until(&mut reference, timing.setup_time);
        self.emitter.emit(LogEvent::StartOfRound(marker));
        log::debug!("round {} (node {}) started", round.index, round.active_node);

        self.mode.pre_round(round);
        overruns.extend(check_deadline(
            &self.clock,
            &self.emitter,
            round.index,
            Some(0),
            round.slot(0).deadline,
        ));
        self.clock.delay_until(&mut reference, timing.start_delay);

        {
            let mut ctx = SlotContext {
                clock: &mut self.clock,
                emitter: &self.emitter,
                node: self.node,
            };
            for index in 0..timing.slots {
                self.slot_pin.set(Level::High);
                self.slot_pin.set(Level::Low);
                overruns.extend(dispatch(&mut ctx, &mut self.mode, round, round.slot(index)));
            }
        }

        overruns.extend(check_deadline(
            &self.clock,
            &self.emitter,
            round.index,
            None,
            round.end(),
        ));
        let mut anchor = round.anchor;
        self.clock.delay_until(&mut anchor, timing.round_period);

        self.mode.post_round(round);
        self.emitter.emit(LogEvent::EndOfRound(marker));
        anchor
    }

    fn pulse_round(&mut self) {
        self.round_pin.set(Level::High);
        self.clock.delay(ROUND_PULSE);
        self.round_pin.set(Level::Low);
    }

    fn heartbeat(&mut self) -> ! {
        self.round_pin.set(Level::High);
        self.clock.delay(TERMINAL_PULSE);
        self.round_pin.set(Level::Low);
        loop {
            self.round_pin.set(Level::High);
            self.clock.delay(HEARTBEAT_PULSE);
            self.round_pin.set(Level::Low);
            self.clock.delay(HEARTBEAT_PERIOD);
        }
    }
}
