//! Test duration estimate for scheduling a testbed run.

use linktest_core::{Message, ModeConfig, PlanError, ScheduleTiming, TestPlan, TickDuration};
use linktest_engine::strategy::airtime_params;
use linktest_sim::{airtime, flood_duration_us};
use serde::Serialize;

use crate::error::EvalError;

/// Boot time of the node firmware before the scheduler starts.
pub const FIRMWARE_STARTUP_MS: u64 = 1_300;
/// Delay between power-up and the synchronization edge.
pub const SYNC_DELAY_MS: u64 = 10_000;
/// Margin after the last round.
pub const SLACK_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationEstimate {
    pub slot_time_ms: u32,
    pub slot_period_ms: u32,
    pub round_period_ms: u32,
    pub rounds: usize,
    pub total_ms: u64,
}

impl DurationEstimate {
    pub fn total_secs(&self) -> f64 {
        self.total_ms as f64 / 1_000.0
    }
}

/// Slot time a node would derive for `plan`.
pub fn slot_time(plan: &TestPlan) -> Result<TickDuration, EvalError> {
    let payload_len =
        u8::try_from(Message::new(0, plan.key().clone()).encoded_len()).unwrap_or(u8::MAX);
    match *plan.mode_config() {
        ModeConfig::P2p(config) => {
            let us = airtime::time_on_air_us(&airtime_params(&config), payload_len);
            Ok(TickDuration::from_micros_ceil(u64::from(us)))
        }
        ModeConfig::Flood(config) => {
            let us =
                flood_duration_us(config.modulation, payload_len, config.n_tx, config.num_hops);
            config
                .flood_gap
                .checked_mul(2)
                .and_then(|gaps| gaps.checked_add(TickDuration::from_micros_ceil(u64::from(us))))
                .ok_or(EvalError::Timing(PlanError::TimingOverflow))
        }
    }
}

/// Round period and overall duration of `plan`. `slot_time_override`
/// replaces the airtime-derived slot time.
pub fn estimate(
    plan: &TestPlan,
    slot_time_override: Option<TickDuration>,
) -> Result<DurationEstimate, EvalError> {
    let slot_time = match slot_time_override {
        Some(slot_time) => slot_time,
        None => slot_time(plan)?,
    };
    let timing = ScheduleTiming::derive(plan, slot_time)?;
    let rounds = plan.rounds();
    let total_ms = FIRMWARE_STARTUP_MS + SYNC_DELAY_MS + timing.rounds_duration(rounds) + SLACK_MS;
    Ok(DurationEstimate {
        slot_time_ms: slot_time.as_millis(),
        slot_period_ms: timing.slot_period.as_millis(),
        round_period_ms: timing.round_period.as_millis(),
        rounds,
        total_ms,
    })
}
