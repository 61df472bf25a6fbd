//! Structured records produced by a node during a run.
//!
//! With the `serde` feature each [`LogEvent`] serializes as a flat JSON object
//! tagged by `"type"`, e.g. `{"type":"StartOfRound","round":0,"node":1}`.

use core::fmt;

use crate::node::NodeId;
use crate::plan::{FloodConfig, InitiatorPolicy, Key, Mode, Modem, RadioConfig, TestPlan};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Run parameters, emitted once before the synchronization wait.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct TestConfigRecord {
    pub p2p_mode: bool,
    pub flood_mode: bool,
    pub num_nodes: u16,
    pub num_tx: u16,
    pub setup_time: u32,
    pub start_delay: u32,
    pub stop_delay: u32,
    #[cfg_attr(feature = "serde", serde(rename = "txSlack"))]
    pub slot_gap: u32,
    pub key: Key,
}

impl From<&TestPlan> for TestConfigRecord {
    fn from(plan: &TestPlan) -> Self {
        Self {
            p2p_mode: plan.mode() == Mode::P2p,
            flood_mode: plan.mode() == Mode::Flood,
            num_nodes: plan.rounds() as u16,
            num_tx: plan.slots(),
            setup_time: plan.setup_time().as_millis(),
            start_delay: plan.start_delay().as_millis(),
            stop_delay: plan.stop_delay().as_millis(),
            slot_gap: plan.slot_gap().as_millis(),
            key: plan.key().clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct RadioConfigRecord {
    pub tx_power: i8,
    pub frequency: u32,
    pub modulation: Modem,
    pub datarate: u32,
    pub bandwidth: u32,
    pub coderate: u8,
    pub preamble_length: u16,
    pub implicit_header: bool,
    pub crc_on: bool,
}

impl From<&RadioConfig> for RadioConfigRecord {
    fn from(cfg: &RadioConfig) -> Self {
        Self {
            tx_power: cfg.tx_power,
            frequency: cfg.frequency,
            modulation: cfg.modem,
            datarate: cfg.datarate,
            bandwidth: cfg.bandwidth,
            coderate: cfg.coderate,
            preamble_length: cfg.preamble_len,
            implicit_header: cfg.implicit_header,
            crc_on: cfg.crc_on,
        }
    }
}

/// Flood parameters; `initiator` is 0 and `delayTx` is 0 under the rotating policy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct FloodConfigRecord {
    pub rf_band: u8,
    pub tx_power: i8,
    pub modulation: u8,
    pub n_tx: u8,
    pub num_hops: u8,
    pub flood_gap: u32,
    pub delay_tx: u8,
    pub initiator: u16,
}

impl From<&FloodConfig> for FloodConfigRecord {
    fn from(cfg: &FloodConfig) -> Self {
        let (initiator, delay_tx) = match cfg.initiator {
            InitiatorPolicy::Rotating => (0, 0),
            InitiatorPolicy::Fixed {
                initiator,
                delay_hops,
            } => (initiator.raw(), delay_hops),
        };
        Self {
            rf_band: cfg.rf_band,
            tx_power: cfg.tx_power,
            modulation: cfg.modulation,
            n_tx: cfg.n_tx,
            num_hops: cfg.num_hops,
            flood_gap: cfg.flood_gap.as_millis(),
            delay_tx,
            initiator,
        }
    }
}

/// Round boundary; `node` is the node owning the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoundMarker {
    pub round: u16,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RxDoneRecord {
    pub key: Key,
    pub size: u16,
    pub counter: u16,
    pub rssi: i16,
    pub snr: i8,
    pub crc_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloodDoneRecord {
    pub is_initiator: bool,
    pub rx_cnt: u8,
    pub rx_idx: u8,
    pub rx_started: u8,
    pub rssi: i16,
    pub snr: i8,
    pub payload_len: u8,
    pub t_ref_updated: bool,
    pub counter: u16,
    pub key: Key,
}

/// A deadline that had already passed when the scheduler reached it.
/// `slot` is `None` for the end-of-round deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OverrunRecord {
    pub round: u16,
    pub slot: Option<u16>,
    pub late_by: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum RadioWarningKind {
    /// Interrupt line already asserted when the radio was initialized.
    IrqLineHigh,
    /// Radio was found outside receive mode while reception was expected.
    LeftReceive,
    /// An interrupt was pending without having been processed.
    MissedIrq,
}

impl fmt::Display for RadioWarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioWarningKind::IrqLineHigh => write!(f, "radio interrupt line high at init"),
            RadioWarningKind::LeftReceive => write!(f, "radio left receive mode"),
            RadioWarningKind::MissedIrq => write!(f, "radio interrupt missed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RadioWarningRecord {
    pub kind: RadioWarningKind,
}

/// Every record a node can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "type")
)]
pub enum LogEvent {
    TestConfig(TestConfigRecord),
    RadioConfig(RadioConfigRecord),
    FloodConfig(FloodConfigRecord),
    StartOfRound(RoundMarker),
    EndOfRound(RoundMarker),
    TxDone,
    RxDone(RxDoneRecord),
    FloodDone(FloodDoneRecord),
    Overrun(OverrunRecord),
    RadioWarning(RadioWarningRecord),
}

impl LogEvent {
    /// Record type name as it appears in the `"type"` field.
    pub fn name(&self) -> &'static str {
        match self {
            LogEvent::TestConfig(_) => "TestConfig",
            LogEvent::RadioConfig(_) => "RadioConfig",
            LogEvent::FloodConfig(_) => "FloodConfig",
            LogEvent::StartOfRound(_) => "StartOfRound",
            LogEvent::EndOfRound(_) => "EndOfRound",
            LogEvent::TxDone => "TxDone",
            LogEvent::RxDone(_) => "RxDone",
            LogEvent::FloodDone(_) => "FloodDone",
            LogEvent::Overrun(_) => "Overrun",
            LogEvent::RadioWarning(_) => "RadioWarning",
        }
    }

    pub fn radio_warning(kind: RadioWarningKind) -> Self {
        LogEvent::RadioWarning(RadioWarningRecord { kind })
    }
}
