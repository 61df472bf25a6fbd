//! Virtual clock and recording capabilities for host tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use linktest_core::{
    LogEvent, NodeId, RadioConfig, TestPlan, Tick, TickCounter, TickDuration,
};
use linktest_hal::{
    AirtimeParams, Flood, FloodRole, FloodStats, HalError, HalResult, Level, Radio, RadioEvents,
    RxArm, RxConfig, SignalPin, SyncInput, TimeAuthority, TxConfig,
};

use crate::link::RadioLink;
use crate::scheduler::RoundScheduler;
use crate::strategy::{ActiveMode, NoFlood};
use crate::trace::{Emitter, EventHook, TraceError};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Clock that jumps straight to every delay target.
#[derive(Clone, Default)]
pub struct VirtualClock {
    counter: Arc<TickCounter>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates work that takes `ticks`.
    pub fn advance(&self, ticks: u64) {
        self.counter.advance_by(ticks);
    }
}

impl TimeAuthority for VirtualClock {
    fn now(&self) -> Tick {
        self.counter.now()
    }

    fn delay_until(&mut self, reference: &mut Tick, increment: TickDuration) -> bool {
        let target = *reference + increment;
        *reference = target;
        let now = self.counter.now();
        if target.is_after(now) {
            self.counter.advance_by(target.raw() - now.raw());
            true
        } else {
            false
        }
    }
}

/// Collects emitted records together with the tick they were emitted at.
#[derive(Clone)]
pub struct Recorder {
    clock: VirtualClock,
    events: Arc<Mutex<Vec<(Tick, LogEvent)>>>,
}

impl Recorder {
    pub fn new(clock: &VirtualClock) -> Self {
        Self {
            clock: clock.clone(),
            events: Arc::default(),
        }
    }

    pub fn emitter(&self) -> Emitter {
        let events = Arc::clone(&self.events);
        let clock = self.clock.clone();
        let hook: EventHook = Arc::new(move |event: &LogEvent| -> Result<(), TraceError> {
            events.lock().unwrap().push((clock.now(), event.clone()));
            Ok(())
        });
        Emitter::new(hook)
    }

    pub fn events(&self) -> Vec<(Tick, LogEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn named(&self, name: &str) -> Vec<(Tick, LogEvent)> {
        self.events()
            .into_iter()
            .filter(|(_, event)| event.name() == name)
            .collect()
    }

    pub fn ticks_of(&self, name: &str) -> Vec<u64> {
        self.named(name).iter().map(|(at, _)| at.raw()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    Init,
    Standby,
    SetChannel(u32),
    SetTx(TxConfig),
    SetRx(RxConfig),
    Send { at: Tick, payload: Vec<u8> },
    Rx(RxArm),
}

#[derive(Debug, Clone)]
pub enum PendingIrq {
    TxDone,
    RxDone {
        payload: Vec<u8>,
        rssi: i16,
        snr: i8,
        crc_error: bool,
    },
}

#[derive(Default)]
pub struct RadioState {
    pub calls: Vec<RadioCall>,
    pub pending: VecDeque<PendingIrq>,
    pub receiving: bool,
    /// Interrupt line stays asserted regardless of pending events.
    pub irq_stuck: bool,
    pub init_error: Option<HalError>,
    pub airtime_us: u32,
    /// `(n, ticks)`: the n-th send (0-based) takes `ticks`.
    pub stall: Option<(usize, u64)>,
    sends: usize,
}

#[derive(Clone)]
pub struct RadioProbe(Arc<Mutex<RadioState>>);

impl RadioProbe {
    pub fn state(&self) -> MutexGuard<'_, RadioState> {
        self.0.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<RadioCall> {
        self.state().calls.clone()
    }

    pub fn sends(&self) -> Vec<(Tick, Vec<u8>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RadioCall::Send { at, payload } => Some((at, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn inject_rx(&self, payload: &[u8]) {
        self.state().pending.push_back(PendingIrq::RxDone {
            payload: payload.to_vec(),
            rssi: -70,
            snr: 9,
            crc_error: false,
        });
    }
}

pub struct MockRadio {
    state: Arc<Mutex<RadioState>>,
    clock: VirtualClock,
}

pub fn mock_radio(clock: &VirtualClock, airtime_us: u32) -> (MockRadio, RadioProbe) {
    let state = Arc::new(Mutex::new(RadioState {
        airtime_us,
        ..RadioState::default()
    }));
    (
        MockRadio {
            state: Arc::clone(&state),
            clock: clock.clone(),
        },
        RadioProbe(state),
    )
}

impl MockRadio {
    fn state(&self) -> MutexGuard<'_, RadioState> {
        self.state.lock().unwrap()
    }
}

impl Radio for MockRadio {
    fn init(&mut self) -> HalResult<()> {
        let mut state = self.state();
        state.calls.push(RadioCall::Init);
        match state.init_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn standby(&mut self) {
        let mut state = self.state();
        state.receiving = false;
        state.calls.push(RadioCall::Standby);
    }

    fn set_channel(&mut self, frequency_hz: u32) {
        self.state().calls.push(RadioCall::SetChannel(frequency_hz));
    }

    fn set_tx_config(&mut self, config: &TxConfig) {
        self.state().calls.push(RadioCall::SetTx(*config));
    }

    fn set_rx_config(&mut self, config: &RxConfig) {
        self.state().calls.push(RadioCall::SetRx(*config));
    }

    fn send(&mut self, payload: &[u8]) -> HalResult<()> {
        let mut state = self.state();
        state.calls.push(RadioCall::Send {
            at: self.clock.now(),
            payload: payload.to_vec(),
        });
        state.pending.push_back(PendingIrq::TxDone);
        state.receiving = false;
        let index = state.sends;
        state.sends += 1;
        if let Some((n, ticks)) = state.stall {
            if n == index {
                self.clock.advance(ticks);
            }
        }
        Ok(())
    }

    fn rx_boosted_with_mask(&mut self, arm: RxArm) {
        let mut state = self.state();
        state.receiving = true;
        state.calls.push(RadioCall::Rx(arm));
    }

    fn time_on_air(&self, _params: &AirtimeParams, _payload_len: u8) -> u32 {
        self.state().airtime_us
    }

    fn irq_process(&mut self, events: &mut dyn RadioEvents) {
        let drained: Vec<PendingIrq> = self.state().pending.drain(..).collect();
        for irq in drained {
            match irq {
                PendingIrq::TxDone => events.on_tx_done(),
                PendingIrq::RxDone {
                    payload,
                    rssi,
                    snr,
                    crc_error,
                } => events.on_rx_done(&payload, rssi, snr, crc_error),
            }
        }
    }

    fn is_receiving(&self) -> bool {
        self.state().receiving
    }

    fn irq_pending(&self) -> bool {
        let state = self.state();
        state.irq_stuck || !state.pending.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FloodCall {
    Configure { rf_band: u8, tx_power: i8, modulation: u8 },
    TxDelay(u8),
    Start { at: Tick, initiator: bool, payload: Vec<u8> },
    Stop { at: Tick },
}

#[derive(Default)]
pub struct FloodState {
    pub calls: Vec<FloodCall>,
    pub duration_us: u32,
    pub stats: FloodStats,
    /// Payload handed back by `stop` on receivers.
    pub rx_payload: Vec<u8>,
}

#[derive(Clone)]
pub struct FloodProbe(Arc<Mutex<FloodState>>);

impl FloodProbe {
    pub fn state(&self) -> MutexGuard<'_, FloodState> {
        self.0.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<FloodCall> {
        self.state().calls.clone()
    }
}

pub struct MockFlood {
    state: Arc<Mutex<FloodState>>,
    clock: VirtualClock,
}

pub fn mock_flood(clock: &VirtualClock, duration_us: u32) -> (MockFlood, FloodProbe) {
    let state = Arc::new(Mutex::new(FloodState {
        duration_us,
        ..FloodState::default()
    }));
    (
        MockFlood {
            state: Arc::clone(&state),
            clock: clock.clone(),
        },
        FloodProbe(state),
    )
}

impl Flood for MockFlood {
    fn configure(&mut self, rf_band: u8, tx_power: i8, modulation: u8) -> HalResult<()> {
        self.state.lock().unwrap().calls.push(FloodCall::Configure {
            rf_band,
            tx_power,
            modulation,
        });
        Ok(())
    }

    fn set_tx_delay(&mut self, hops: u8) {
        self.state.lock().unwrap().calls.push(FloodCall::TxDelay(hops));
    }

    fn start(&mut self, role: FloodRole<'_>, _n_tx: u8, _slot_sync: bool) -> HalResult<()> {
        let payload = match role {
            FloodRole::Initiator { payload } => payload.to_vec(),
            FloodRole::Receiver => Vec::new(),
        };
        self.state.lock().unwrap().calls.push(FloodCall::Start {
            at: self.clock.now(),
            initiator: role.is_initiator(),
            payload,
        });
        Ok(())
    }

    fn stop(&mut self, payload: &mut [u8]) -> FloodStats {
        let mut state = self.state.lock().unwrap();
        state.calls.push(FloodCall::Stop {
            at: self.clock.now(),
        });
        let len = state.rx_payload.len().min(payload.len());
        payload[..len].copy_from_slice(&state.rx_payload[..len]);
        FloodStats {
            payload_len: len as u8,
            ..state.stats
        }
    }

    fn flood_duration(&self, _payload_len: u8, _n_tx: u8, _num_hops: u8) -> u32 {
        self.state.lock().unwrap().duration_us
    }
}

/// Sync input asserted after a number of unsuccessful polls.
pub struct MockSync {
    remaining: u32,
    polls: Arc<AtomicU32>,
}

impl MockSync {
    pub fn after(polls: u32) -> (Self, Arc<AtomicU32>) {
        let counter = Arc::new(AtomicU32::new(0));
        (
            Self {
                remaining: polls,
                polls: Arc::clone(&counter),
            },
            counter,
        )
    }

    pub fn ready() -> Self {
        Self::after(0).0
    }
}

impl SyncInput for MockSync {
    fn poll(&mut self) -> nb::Result<(), HalError> {
        self.polls.fetch_add(1, Ordering::Relaxed);
        if self.remaining == 0 {
            Ok(())
        } else {
            self.remaining -= 1;
            Err(nb::Error::WouldBlock)
        }
    }
}

#[derive(Clone)]
pub struct RecordingPin {
    clock: VirtualClock,
    pub levels: Arc<Mutex<Vec<(Tick, Level)>>>,
}

impl RecordingPin {
    pub fn new(clock: &VirtualClock) -> Self {
        Self {
            clock: clock.clone(),
            levels: Arc::default(),
        }
    }

    pub fn rising_edges(&self) -> Vec<u64> {
        self.levels
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, level)| *level == Level::High)
            .map(|(at, _)| at.raw())
            .collect()
    }
}

impl SignalPin for RecordingPin {
    fn set(&mut self, level: Level) {
        self.levels.lock().unwrap().push((self.clock.now(), level));
    }
}

pub fn p2p_plan(roster: &[u16]) -> TestPlan {
    TestPlan::builder()
        .roster(roster.iter().copied())
        .p2p(RadioConfig::lora())
        .build()
        .unwrap()
}

pub type P2pScheduler = RoundScheduler<VirtualClock, MockSync, ActiveMode<MockRadio, NoFlood>>;

/// A P2P node wired to mocks.
pub struct P2pNode {
    pub clock: VirtualClock,
    pub radio: RadioProbe,
    pub recorder: Recorder,
    pub link: Arc<RadioLink<MockRadio>>,
    pub scheduler: P2pScheduler,
}

pub fn p2p_node(plan: TestPlan, node: u16, airtime_us: u32) -> P2pNode {
    p2p_node_with(plan, node, airtime_us, MockSync::ready(), |_| {})
}

pub fn p2p_node_with(
    plan: TestPlan,
    node: u16,
    airtime_us: u32,
    sync: MockSync,
    setup: impl FnOnce(&mut RadioState),
) -> P2pNode {
    init_logger();
    let clock = VirtualClock::new();
    let recorder = Recorder::new(&clock);
    let (radio, probe) = mock_radio(&clock, airtime_us);
    setup(&mut probe.state());
    let link = Arc::new(RadioLink::new(radio, recorder.emitter()));
    let mode = ActiveMode::from_plan(&plan, Some(Arc::clone(&link)), None::<NoFlood>).unwrap();
    let scheduler = RoundScheduler::new(plan, NodeId(node), mode, clock.clone(), sync)
        .with_emitter(recorder.emitter());
    P2pNode {
        clock,
        radio: probe,
        recorder,
        link,
        scheduler,
    }
}
