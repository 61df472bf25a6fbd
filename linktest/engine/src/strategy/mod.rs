//! Mode strategies: what a node does in each slot.
//!
//! The scheduler owns the timeline and calls into a [`ModeStrategy`] at fixed
//! points of every round. The mode is chosen once from the plan through
//! [`ActiveMode::from_plan`].

mod flood;
mod p2p;

pub use flood::{FloodStrategy, NoFlood};
pub use p2p::{airtime_params, rx_config, tx_config, P2pStrategy};

use linktest_core::{LogEvent, Mode, ModeConfig, NodeId, RoundState, SlotEvent, TestPlan, TickDuration};
use linktest_hal::{Flood, Radio, TimeAuthority};

use crate::error::EngineError;
use crate::link::RadioLink;
use crate::sync::Arc;
use crate::trace::Emitter;

/// What a strategy may use while the scheduler hands it control.
pub struct SlotContext<'a, C> {
    pub clock: &'a mut C,
    pub emitter: &'a Emitter,
    pub node: NodeId,
}

pub trait ModeStrategy {
    fn mode(&self) -> Mode;

    /// Configuration record emitted once before the run.
    fn config_event(&self) -> LogEvent;

    /// One-time capability setup. Returns the airtime of one slot's action.
    fn prepare<C: TimeAuthority>(
        &mut self,
        ctx: &mut SlotContext<'_, C>,
    ) -> Result<TickDuration, EngineError>;

    /// Called after `StartOfRound`, before the start delay elapses.
    fn pre_round(&mut self, round: &RoundState);

    /// Called at the slot's deadline. Must return before the next deadline.
    fn on_slot<C: TimeAuthority>(
        &mut self,
        ctx: &mut SlotContext<'_, C>,
        round: &RoundState,
        slot: &SlotEvent,
    );

    /// Called once the round period has elapsed, before `EndOfRound`.
    fn post_round(&mut self, round: &RoundState);
}

/// Strategy selected by the plan's mode.
pub enum ActiveMode<R, F> {
    P2p(P2pStrategy<R>),
    Flood(FloodStrategy<F>),
}

impl<R: Radio, F: Flood> ActiveMode<R, F> {
    /// Picks the strategy for `plan`. The capability the mode needs must be
    /// present; the other one is ignored.
    pub fn from_plan(
        plan: &TestPlan,
        radio: Option<Arc<RadioLink<R>>>,
        flood: Option<F>,
    ) -> Result<Self, EngineError> {
        match *plan.mode_config() {
            ModeConfig::P2p(config) => {
                let link = radio.ok_or(EngineError::MissingRadio)?;
                Ok(Self::P2p(P2pStrategy::new(link, config, plan)))
            }
            ModeConfig::Flood(config) => {
                let flood = flood.ok_or(EngineError::MissingFlood)?;
                Ok(Self::Flood(FloodStrategy::new(flood, config, plan)))
            }
        }
    }
}

impl<R: Radio, F: Flood> ModeStrategy for ActiveMode<R, F> {
    fn mode(&self) -> Mode {
        match self {
            Self::P2p(inner) => inner.mode(),
            Self::Flood(inner) => inner.mode(),
        }
    }

    fn config_event(&self) -> LogEvent {
        match self {
            Self::P2p(inner) => inner.config_event(),
            Self::Flood(inner) => inner.config_event(),
        }
    }

    fn prepare<C: TimeAuthority>(
        &mut self,
        ctx: &mut SlotContext<'_, C>,
    ) -> Result<TickDuration, EngineError> {
        match self {
            Self::P2p(inner) => inner.prepare(ctx),
            Self::Flood(inner) => inner.prepare(ctx),
        }
    }

    fn pre_round(&mut self, round: &RoundState) {
        match self {
            Self::P2p(inner) => inner.pre_round(round),
            Self::Flood(inner) => inner.pre_round(round),
        }
    }

    fn on_slot<C: TimeAuthority>(
        &mut self,
        ctx: &mut SlotContext<'_, C>,
        round: &RoundState,
        slot: &SlotEvent,
    ) {
        match self {
            Self::P2p(inner) => inner.on_slot(ctx, round, slot),
            Self::Flood(inner) => inner.on_slot(ctx, round, slot),
        }
    }

    fn post_round(&mut self, round: &RoundState) {
        match self {
            Self::P2p(inner) => inner.post_round(round),
            Self::Flood(inner) => inner.post_round(round),
        }
    }
}
