//! Simulated transceiver.

use std::sync::{Arc, Mutex};

use linktest_core::NodeId;
use linktest_hal::{
    AirtimeParams, HalError, HalResult, IrqMask, Radio, RadioEvents, RxArm, RxConfig, TxConfig,
};

use crate::airtime;
use crate::medium::{lock, EndpointState, Ether};

/// Largest frame the simulated transceiver accepts.
pub const MAX_FRAME_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Sleep,
    Standby,
    Rx,
    Tx,
}

/// Interrupt waiting to be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RadioIrq {
    TxDone,
    RxDone {
        payload: Vec<u8>,
        rssi: i16,
        snr: i8,
        crc_error: bool,
    },
}

/// Radio of one node. Frames are delivered to the other endpoints of the
/// [`Ether`] as soon as they are sent; airtime only shows up in the schedule.
pub struct SimRadio {
    node: NodeId,
    ether: Arc<Ether>,
    state: Arc<Mutex<EndpointState>>,
    tx_config: Option<TxConfig>,
    rx_config: Option<RxConfig>,
}

impl SimRadio {
    pub(crate) fn new(node: NodeId, ether: Arc<Ether>, state: Arc<Mutex<EndpointState>>) -> Self {
        Self {
            node,
            ether,
            state,
            tx_config: None,
            rx_config: None,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn mode(&self) -> RadioMode {
        lock(&self.state).mode
    }

    pub fn channel(&self) -> u32 {
        lock(&self.state).channel
    }

    pub fn tx_config(&self) -> Option<&TxConfig> {
        self.tx_config.as_ref()
    }

    pub fn rx_config(&self) -> Option<&RxConfig> {
        self.rx_config.as_ref()
    }

    fn set_mode(&self, mode: RadioMode) {
        lock(&self.state).mode = mode;
    }
}

impl Radio for SimRadio {
    fn init(&mut self) -> HalResult<()> {
        let mut state = lock(&self.state);
        if state.faults.fail_init {
            return Err(HalError::HardwareError);
        }
        state.mode = RadioMode::Standby;
        state.pending.clear();
        Ok(())
    }

    fn standby(&mut self) {
        self.set_mode(RadioMode::Standby);
    }

    fn set_channel(&mut self, frequency_hz: u32) {
        lock(&self.state).channel = frequency_hz;
    }

    fn set_tx_config(&mut self, config: &TxConfig) {
        self.tx_config = Some(*config);
    }

    fn set_rx_config(&mut self, config: &RxConfig) {
        self.rx_config = Some(*config);
    }

    fn send(&mut self, payload: &[u8]) -> HalResult<()> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(HalError::PayloadTooLong {
                len: payload.len(),
                max: MAX_FRAME_LEN,
            });
        }
        self.set_mode(RadioMode::Tx);
        let reached = self.ether.transmit(self.node, payload);
        log::trace!("node {} sent {} bytes, {reached} receivers", self.node, payload.len());
        Ok(())
    }

    fn rx_boosted_with_mask(&mut self, arm: RxArm) {
        let mut state = lock(&self.state);
        state.mode = RadioMode::Rx;
        state.rx_mask = arm.mask;
    }

    fn time_on_air(&self, params: &AirtimeParams, payload_len: u8) -> u32 {
        airtime::time_on_air_us(params, payload_len)
    }

    fn irq_process(&mut self, events: &mut dyn RadioEvents) {
        let pending: Vec<RadioIrq> = lock(&self.state).pending.drain(..).collect();
        for irq in pending {
            match irq {
                RadioIrq::TxDone => events.on_tx_done(),
                RadioIrq::RxDone {
                    payload,
                    rssi,
                    snr,
                    crc_error,
                } => {
                    events.on_rx_done(&payload, rssi, snr, crc_error);
                    if crc_error {
                        events.on_rx_error();
                    }
                }
            }
        }
    }

    fn is_receiving(&self) -> bool {
        self.mode() == RadioMode::Rx
    }

    fn irq_pending(&self) -> bool {
        let state = lock(&self.state);
        state.faults.stuck_irq || !state.pending.is_empty()
    }
}

impl Drop for SimRadio {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.mode = RadioMode::Sleep;
        state.rx_mask = IrqMask::NONE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::{Fault, LinkModel, LinkQuality};

    #[derive(Default)]
    struct Collect {
        tx: usize,
        rx: Vec<(Vec<u8>, i16, bool)>,
    }

    impl RadioEvents for Collect {
        fn on_tx_done(&mut self) {
            self.tx += 1;
        }

        fn on_rx_done(&mut self, payload: &[u8], rssi: i16, _snr: i8, crc_error: bool) {
            self.rx.push((payload.to_vec(), rssi, crc_error));
        }
    }

    fn pair(model: LinkModel) -> (SimRadio, SimRadio) {
        let ether = Ether::new(model, 7);
        let mut a = ether.attach(NodeId(1));
        let mut b = ether.attach(NodeId(2));
        a.init().unwrap();
        b.init().unwrap();
        a.set_channel(868_100_000);
        b.set_channel(868_100_000);
        (a, b)
    }

    #[test]
    fn receiver_gets_frame_with_link_quality() {
        let (mut a, mut b) = pair(LinkModel::full_mesh(LinkQuality::new(-72, 5)));
        b.rx_boosted_with_mask(RxArm::continuous_linktest());
        a.send(b"\x01\x00key").unwrap();

        let mut events = Collect::default();
        b.irq_process(&mut events);
        assert_eq!(events.rx, vec![(b"\x01\x00key".to_vec(), -72, false)]);
        assert!(b.is_receiving());

        let mut events = Collect::default();
        a.irq_process(&mut events);
        assert_eq!(events.tx, 1);
        assert_eq!(a.mode(), RadioMode::Standby);
    }

    #[test]
    fn standby_and_foreign_channel_hear_nothing() {
        let (mut a, mut b) = pair(LinkModel::full_mesh(LinkQuality::default()));
        a.send(b"x").unwrap();
        assert!(!b.irq_pending());

        b.set_channel(869_000_000);
        b.rx_boosted_with_mask(RxArm::continuous_linktest());
        a.send(b"x").unwrap();
        assert!(!b.irq_pending());
    }

    #[test]
    fn corrupted_link_flags_crc_errors() {
        let quality = LinkQuality::default().with_corruption(1.0);
        let (mut a, mut b) = pair(LinkModel::full_mesh(quality));
        b.rx_boosted_with_mask(RxArm::continuous_linktest());
        a.send(b"\x00\x00ab").unwrap();

        let mut events = Collect::default();
        b.irq_process(&mut events);
        assert_eq!(events.rx.len(), 1);
        assert!(events.rx[0].2);
        assert_ne!(events.rx[0].0, b"\x00\x00ab".to_vec());
    }

    #[test]
    fn injected_faults_take_effect() {
        let ether = Ether::new(LinkModel::full_mesh(LinkQuality::default()), 1);
        let mut a = ether.attach(NodeId(1));
        let mut b = ether.attach(NodeId(2));
        assert!(ether.inject(NodeId(2), Fault::FailInit));
        assert_eq!(b.init(), Err(HalError::HardwareError));

        a.init().unwrap();
        b.rx_boosted_with_mask(RxArm::continuous_linktest());
        ether.inject(NodeId(2), Fault::LeaveRxAfterNextFrame);
        a.send(b"y").unwrap();
        assert!(!b.is_receiving());
        assert!(b.irq_pending());

        ether.inject(NodeId(1), Fault::StuckIrqLine);
        a.irq_process(&mut Collect::default());
        assert!(a.irq_pending());
        assert!(!ether.inject(NodeId(9), Fault::StuckIrqLine));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let (mut a, _b) = pair(LinkModel::disconnected());
        assert_eq!(
            a.send(&[0; 256]),
            Err(HalError::PayloadTooLong { len: 256, max: 255 })
        );
    }
}
