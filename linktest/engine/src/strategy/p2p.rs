//! Point-to-point mode: one transmitter per round, everybody else listens.

use linktest_core::{
    Key, LogEvent, Message, Mode, Modem, RadioConfig, RadioWarningKind, RoundState, SlotEvent,
    TestPlan, TickDuration, MAX_PAYLOAD_LEN,
};
use linktest_hal::{AirtimeParams, Radio, RxArm, RxConfig, TimeAuthority, TxConfig};

use super::{ModeStrategy, SlotContext};
use crate::error::EngineError;
use crate::link::RadioLink;
use crate::sync::Arc;

/// Counter carried by the warm-up frame.
const WARMUP_COUNTER: u16 = 0;

pub fn tx_config(cfg: &RadioConfig) -> TxConfig {
    let (coderate, fixed_len) = match cfg.modem {
        Modem::Lora => (cfg.coderate, cfg.implicit_header),
        Modem::Fsk => (0, false),
    };
    TxConfig {
        modem: cfg.modem,
        power: cfg.tx_power,
        fdev: cfg.frequency_deviation(),
        bandwidth: cfg.bandwidth,
        datarate: cfg.datarate,
        coderate,
        preamble_len: cfg.preamble_len,
        fixed_len,
        crc_on: cfg.crc_on,
        freq_hop_on: false,
        hop_period: 0,
        iq_inverted: false,
        timeout_ms: 0,
    }
}

/// Continuous receive without symbol timeout. The AFC bandwidth field is
/// unused; FSK widens the channel bandwidth instead.
pub fn rx_config(cfg: &RadioConfig) -> RxConfig {
    let tx = tx_config(cfg);
    RxConfig {
        modem: cfg.modem,
        bandwidth: cfg.rx_bandwidth(),
        datarate: cfg.datarate,
        coderate: tx.coderate,
        bandwidth_afc: 0,
        preamble_len: cfg.preamble_len,
        symb_timeout: 0,
        fixed_len: tx.fixed_len,
        payload_len: 0,
        crc_on: cfg.crc_on,
        freq_hop_on: false,
        hop_period: 0,
        iq_inverted: false,
        rx_continuous: true,
    }
}

pub fn airtime_params(cfg: &RadioConfig) -> AirtimeParams {
    let tx = tx_config(cfg);
    AirtimeParams {
        modem: cfg.modem,
        bandwidth: cfg.bandwidth,
        datarate: cfg.datarate,
        coderate: tx.coderate,
        preamble_len: cfg.preamble_len,
        fixed_len: tx.fixed_len,
        crc_on: cfg.crc_on,
    }
}

pub struct P2pStrategy<R> {
    link: Arc<RadioLink<R>>,
    config: RadioConfig,
    key: Key,
}

impl<R: Radio> P2pStrategy<R> {
    pub fn new(link: Arc<RadioLink<R>>, config: RadioConfig, plan: &TestPlan) -> Self {
        Self {
            link,
            config,
            key: plan.key().clone(),
        }
    }

    pub fn link(&self) -> &Arc<RadioLink<R>> {
        &self.link
    }

    fn message(&self, counter: u16) -> Message {
        Message::new(counter, self.key.clone())
    }

    fn configure(&self) {
        let tx = tx_config(&self.config);
        let rx = rx_config(&self.config);
        self.link.with(|cell| {
            let radio = cell.radio();
            radio.standby();
            radio.set_channel(self.config.frequency);
            radio.set_tx_config(&tx);
            radio.standby();
            radio.set_channel(self.config.frequency);
            radio.set_rx_config(&rx);
        });
    }

    fn send(&self, counter: u16) {
        let mut buf = [0u8; MAX_PAYLOAD_LEN];
        let len = match self.message(counter).encode(&mut buf) {
            Ok(len) => len,
            Err(err) => {
                log::error!("cannot encode message {counter}: {err}");
                return;
            }
        };
        if let Err(err) = self.link.with(|cell| cell.radio().send(&buf[..len])) {
            log::warn!("send of message {counter} failed: {err}");
        }
    }
}

impl<R: Radio> ModeStrategy for P2pStrategy<R> {
    fn mode(&self) -> Mode {
        Mode::P2p
    }

    fn config_event(&self) -> LogEvent {
        LogEvent::RadioConfig((&self.config).into())
    }

    fn prepare<C: TimeAuthority>(
        &mut self,
        ctx: &mut SlotContext<'_, C>,
    ) -> Result<TickDuration, EngineError> {
        let params = airtime_params(&self.config);
        let payload_len = u8::try_from(self.message(0).encoded_len()).unwrap_or(u8::MAX);
        let (airtime_us, irq_high) = self.link.with(|cell| {
            let radio = cell.radio();
            radio.init()?;
            let irq_high = radio.irq_pending();
            radio.set_channel(self.config.frequency);
            Ok::<_, EngineError>((radio.time_on_air(&params, payload_len), irq_high))
        })?;

        if irq_high {
            log::warn!("radio interrupt line high after init");
            ctx.emitter
                .emit(LogEvent::radio_warning(RadioWarningKind::IrqLineHigh));
        }

        let slot_time = TickDuration::from_micros_ceil(u64::from(airtime_us));
        log::info!(
            "{} time on air for {payload_len} bytes: {airtime_us}us, slot time {slot_time}",
            self.config.modem
        );

        if self.config.needs_warmup_tx() {
            log::debug!("sending warm-up frame");
            self.configure();
            self.send(WARMUP_COUNTER);
            ctx.clock.delay(slot_time);
            self.link.with(|cell| cell.standby());
        }

        Ok(slot_time)
    }

    fn pre_round(&mut self, round: &RoundState) {
        self.configure();
        if !round.is_local_transmitter {
            self.link
                .with(|cell| cell.arm_rx(RxArm::continuous_linktest()));
        }
    }

    fn on_slot<C: TimeAuthority>(
        &mut self,
        _ctx: &mut SlotContext<'_, C>,
        round: &RoundState,
        slot: &SlotEvent,
    ) {
        if round.is_local_transmitter {
            self.send(slot.index);
        }
    }

    fn post_round(&mut self, _round: &RoundState) {
        self.link.with(|cell| cell.standby());
    }
}
