//! Flood mode: one multi-hop flood per slot, bracketed by guard gaps.
//!
//! ```text
//! deadline                                              next deadline - slot_gap
//!    |<-- gap -->|<------- flood duration ------->|<-- gap -->|
//!    Rx start    Initiator start                  Initiator stop / Rx stop
//! ```

use linktest_core::{
    FloodConfig, FloodDoneRecord, InitiatorPolicy, Key, LogEvent, Message, Mode, NodeId,
    NodeRoster, PlanError, RoundState, SlotEvent, TestPlan, TickDuration, MAX_PAYLOAD_LEN,
};
use linktest_hal::{Flood, FloodRole, FloodStats, HalResult, TimeAuthority};

use super::{ModeStrategy, SlotContext};
use crate::error::EngineError;

pub struct FloodStrategy<F> {
    flood: F,
    config: FloodConfig,
    roster: NodeRoster,
    key: Key,
    flood_time: TickDuration,
}

impl<F: Flood> FloodStrategy<F> {
    pub fn new(flood: F, config: FloodConfig, plan: &TestPlan) -> Self {
        Self {
            flood,
            config,
            roster: plan.roster().clone(),
            key: plan.key().clone(),
            flood_time: TickDuration::ZERO,
        }
    }

    pub fn flood(&self) -> &F {
        &self.flood
    }

    /// Whether `node` starts the flood of round `round`.
    pub fn is_initiator(&self, round: u16, node: NodeId) -> bool {
        match self.config.initiator {
            InitiatorPolicy::Rotating => self.roster.node_for_round(usize::from(round)) == Some(node),
            InitiatorPolicy::Fixed { initiator, .. } => initiator == node,
        }
    }

    /// Retransmission delay of `node` in round `round`, in hops.
    pub fn tx_delay(&self, round: u16, node: NodeId) -> u8 {
        match self.config.initiator {
            InitiatorPolicy::Rotating => 0,
            InitiatorPolicy::Fixed {
                initiator,
                delay_hops,
            } => {
                let owner = self.roster.node_for_round(usize::from(round));
                if owner == Some(node) && node != initiator {
                    delay_hops
                } else {
                    0
                }
            }
        }
    }

    fn done_record(is_initiator: bool, stats: FloodStats, message: Message) -> LogEvent {
        LogEvent::FloodDone(FloodDoneRecord {
            is_initiator,
            rx_cnt: stats.rx_cnt,
            rx_idx: stats.rx_idx,
            rx_started: stats.rx_started,
            rssi: stats.rssi,
            snr: stats.snr,
            payload_len: stats.payload_len,
            t_ref_updated: stats.t_ref_updated,
            counter: message.counter,
            key: message.key,
        })
    }

    fn start(&mut self, role: FloodRole<'_>) {
        if let Err(err) = self.flood.start(role, self.config.n_tx, true) {
            log::warn!("flood start failed: {err}");
        }
    }
}

impl<F: Flood> ModeStrategy for FloodStrategy<F> {
    fn mode(&self) -> Mode {
        Mode::Flood
    }

    fn config_event(&self) -> LogEvent {
        LogEvent::FloodConfig((&self.config).into())
    }

    fn prepare<C: TimeAuthority>(
        &mut self,
        _ctx: &mut SlotContext<'_, C>,
    ) -> Result<TickDuration, EngineError> {
        self.flood.configure(
            self.config.rf_band,
            self.config.tx_power,
            self.config.modulation,
        )?;

        let payload_len =
            u8::try_from(Message::new(0, self.key.clone()).encoded_len()).unwrap_or(u8::MAX);
        let duration_us =
            self.flood
                .flood_duration(payload_len, self.config.n_tx, self.config.num_hops);
        self.flood_time = TickDuration::from_micros_ceil(u64::from(duration_us));

        let slot_time = self
            .config
            .flood_gap
            .checked_mul(2)
            .and_then(|gaps| gaps.checked_add(self.flood_time))
            .ok_or(PlanError::TimingOverflow)?;
        log::info!(
            "flood of {payload_len} bytes lasts {}, slot time {slot_time}",
            self.flood_time
        );
        Ok(slot_time)
    }

    fn pre_round(&mut self, round: &RoundState) {
        log::debug!(
            "flood round {} owned by node {}",
            round.index,
            round.active_node
        );
    }

    fn on_slot<C: TimeAuthority>(
        &mut self,
        ctx: &mut SlotContext<'_, C>,
        round: &RoundState,
        slot: &SlotEvent,
    ) {
        let is_initiator = self.is_initiator(round.index, ctx.node);
        self.flood.set_tx_delay(self.tx_delay(round.index, ctx.node));

        let gap = self.config.flood_gap;
        let mut reference = slot.deadline;
        let mut buf = [0u8; MAX_PAYLOAD_LEN];

        let (stats, message) = if is_initiator {
            let message = Message::new(slot.index, self.key.clone());
            let len = match message.encode(&mut buf) {
                Ok(len) => len,
                Err(err) => {
                    log::error!("cannot encode flood payload: {err}");
                    return;
                }
            };
            ctx.clock.delay_until(&mut reference, gap);
            self.start(FloodRole::Initiator {
                payload: &buf[..len],
            });
            ctx.clock.delay_until(&mut reference, self.flood_time);
            let mut scratch = [0u8; MAX_PAYLOAD_LEN];
            (self.flood.stop(&mut scratch), message)
        } else {
            self.start(FloodRole::Receiver);
            ctx.clock
                .delay_until(&mut reference, gap.saturating_mul(2).saturating_add(self.flood_time));
            let stats = self.flood.stop(&mut buf);
            let len = usize::from(stats.payload_len).min(buf.len());
            (stats, Message::from_received(&buf[..len]))
        };

        ctx.emitter
            .emit(Self::done_record(is_initiator, stats, message));
    }

    fn post_round(&mut self, _round: &RoundState) {}
}

/// Flood capability for boards that only run point-to-point tests.
#[derive(Debug, Clone, Copy)]
pub enum NoFlood {}

impl Flood for NoFlood {
    fn configure(&mut self, _rf_band: u8, _tx_power: i8, _modulation: u8) -> HalResult<()> {
        match *self {}
    }

    fn set_tx_delay(&mut self, _hops: u8) {
        match *self {}
    }

    fn start(&mut self, _role: FloodRole<'_>, _n_tx: u8, _slot_sync: bool) -> HalResult<()> {
        match *self {}
    }

    fn stop(&mut self, _payload: &mut [u8]) -> FloodStats {
        match *self {}
    }

    fn flood_duration(&self, _payload_len: u8, _n_tx: u8, _num_hops: u8) -> u32 {
        match *self {}
    }
}
