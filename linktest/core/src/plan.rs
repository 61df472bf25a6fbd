//! Immutable test plan and its builder.

use core::fmt;

use heapless::{String, Vec};

use crate::error::PlanError;
use crate::message::{is_clean_byte, Message, COUNTER_LEN};
use crate::node::{NodeId, NodeRoster, MAX_NODES};
use crate::schedule::ScheduleTiming;
use crate::time::TickDuration;

/// Longest payload key, leaving room for the counter in a 256 byte frame.
pub const MAX_KEY_LEN: usize = 254;

/// Textual key carried by every test packet.
pub type Key = String<MAX_KEY_LEN>;

const DEFAULT_KEY: &str = "deadbeef";

/// Which strategy drives the slots of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    P2p,
    Flood,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::P2p => write!(f, "p2p"),
            Mode::Flood => write!(f, "flood"),
        }
    }
}

/// Radio modem family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Modem {
    Lora,
    Fsk,
}

impl fmt::Display for Modem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modem::Lora => write!(f, "lora"),
            Modem::Fsk => write!(f, "fsk"),
        }
    }
}

/// Whether a throwaway transmission is made before the first receive.
///
/// Some transceivers do not receive reliably in FSK mode until they have
/// transmitted once after power-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum WarmupPolicy {
    /// Warm up for modems known to need it (FSK).
    #[default]
    Auto,
    Always,
    Never,
}

/// Default crystal tolerance divisor for [`RadioConfig::clock_drift`].
pub const DEFAULT_CLOCK_DRIFT: u32 = 40_000;

/// Modulation parameters for P2P mode.
///
/// `datarate` is the spreading factor for LoRa and bits/s for FSK;
/// `bandwidth` is the LoRa bandwidth index (0 = 125 kHz) or FSK bandwidth in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RadioConfig {
    pub modem: Modem,
    pub tx_power: i8,
    pub frequency: u32,
    pub datarate: u32,
    pub bandwidth: u32,
    pub coderate: u8,
    pub preamble_len: u16,
    pub implicit_header: bool,
    pub crc_on: bool,
    pub warmup: WarmupPolicy,
    /// Crystal tolerance as a divisor of the carrier (40 000 = 25 ppm).
    /// Widens the FSK receive bandwidth; 0 disables the margin.
    pub clock_drift: u32,
}

impl RadioConfig {
    /// LoRa SF8 / 125 kHz on 865.44 MHz.
    pub const fn lora() -> Self {
        Self {
            modem: Modem::Lora,
            tx_power: 14,
            frequency: 865_440_000,
            datarate: 8,
            bandwidth: 0,
            coderate: 1,
            preamble_len: 10,
            implicit_header: false,
            crc_on: true,
            warmup: WarmupPolicy::Auto,
            clock_drift: DEFAULT_CLOCK_DRIFT,
        }
    }

    /// FSK 125 kbit/s on 869.0125 MHz.
    pub const fn fsk() -> Self {
        Self {
            modem: Modem::Fsk,
            tx_power: 14,
            frequency: 869_012_500,
            datarate: 125_000,
            bandwidth: 234_300,
            coderate: 0,
            preamble_len: 2,
            implicit_header: false,
            crc_on: true,
            warmup: WarmupPolicy::Auto,
            clock_drift: DEFAULT_CLOCK_DRIFT,
        }
    }

    pub fn needs_warmup_tx(&self) -> bool {
        match self.warmup {
            WarmupPolicy::Auto => self.modem == Modem::Fsk,
            WarmupPolicy::Always => true,
            WarmupPolicy::Never => false,
        }
    }

    /// Receive bandwidth. FSK adds room for the frequency error of both
    /// crystals, `2 * (bandwidth / 2 + frequency) / clock_drift`.
    pub fn rx_bandwidth(&self) -> u32 {
        match self.modem {
            Modem::Lora => self.bandwidth,
            Modem::Fsk => {
                let error = 2 * (u64::from(self.bandwidth / 2) + u64::from(self.frequency));
                let margin = error.checked_div(u64::from(self.clock_drift)).unwrap_or(0);
                self.bandwidth
                    .saturating_add(u32::try_from(margin).unwrap_or(u32::MAX))
            }
        }
    }

    /// FSK frequency deviation derived from bandwidth and datarate.
    pub fn frequency_deviation(&self) -> u32 {
        match self.modem {
            Modem::Lora => 0,
            Modem::Fsk => self.bandwidth.saturating_sub(self.datarate) / 2,
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::lora()
    }
}

/// How the flood initiator of a round is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "policy", rename_all = "snake_case")
)]
pub enum InitiatorPolicy {
    /// The node owning the round initiates.
    Rotating,
    /// One node always initiates; the node owning the round delays its
    /// retransmissions by `delay_hops`.
    Fixed { initiator: NodeId, delay_hops: u8 },
}

/// Parameters for flood mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct FloodConfig {
    pub rf_band: u8,
    pub tx_power: i8,
    pub modulation: u8,
    pub n_tx: u8,
    pub num_hops: u8,
    /// Guard gap before and after the initiator's flood.
    pub flood_gap: TickDuration,
    pub initiator: InitiatorPolicy,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            rf_band: 46,
            tx_power: -5,
            modulation: 10,
            n_tx: 2,
            num_hops: 6,
            flood_gap: TickDuration::from_millis(150),
            initiator: InitiatorPolicy::Fixed {
                initiator: NodeId(2),
                delay_hops: 1,
            },
        }
    }
}

/// Mode tag together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeConfig {
    P2p(RadioConfig),
    Flood(FloodConfig),
}

impl ModeConfig {
    pub fn mode(&self) -> Mode {
        match self {
            ModeConfig::P2p(_) => Mode::P2p,
            ModeConfig::Flood(_) => Mode::Flood,
        }
    }
}

/// Everything a node needs to know about a run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPlan {
    roster: NodeRoster,
    slots: u16,
    setup_time: TickDuration,
    start_delay: TickDuration,
    stop_delay: TickDuration,
    slot_gap: TickDuration,
    key: Key,
    mode: ModeConfig,
}

impl TestPlan {
    pub fn builder() -> TestPlanBuilder {
        TestPlanBuilder::default()
    }

    pub fn roster(&self) -> &NodeRoster {
        &self.roster
    }

    /// One round per roster entry.
    pub fn rounds(&self) -> usize {
        self.roster.len()
    }

    pub fn slots(&self) -> u16 {
        self.slots
    }

    pub fn setup_time(&self) -> TickDuration {
        self.setup_time
    }

    pub fn start_delay(&self) -> TickDuration {
        self.start_delay
    }

    pub fn stop_delay(&self) -> TickDuration {
        self.stop_delay
    }

    pub fn slot_gap(&self) -> TickDuration {
        self.slot_gap
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn mode_config(&self) -> &ModeConfig {
        &self.mode
    }

    /// On-air length of a test message.
    pub fn payload_len(&self) -> usize {
        COUNTER_LEN + self.key.len()
    }

    /// Message sent in slot `counter`.
    pub fn message(&self, counter: u16) -> Message {
        Message::new(counter, self.key.clone())
    }
}

/// Chained builder for [`TestPlan`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct TestPlanBuilder {
    nodes: Vec<u16, MAX_NODES>,
    roster_overflow: bool,
    slots: u16,
    setup_time: TickDuration,
    start_delay: TickDuration,
    stop_delay: TickDuration,
    slot_gap: TickDuration,
    key: Result<Key, PlanError>,
    p2p: Option<RadioConfig>,
    flood: Option<FloodConfig>,
}

impl Default for TestPlanBuilder {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roster_overflow: false,
            slots: 10,
            setup_time: TickDuration::from_millis(500),
            start_delay: TickDuration::from_millis(500),
            stop_delay: TickDuration::from_millis(500),
            slot_gap: TickDuration::from_millis(100),
            key: parse_key(DEFAULT_KEY),
            p2p: None,
            flood: None,
        }
    }
}

impl TestPlanBuilder {
    pub fn roster<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.nodes.clear();
        self.roster_overflow = false;
        for id in ids {
            if self.nodes.push(id).is_err() {
                self.roster_overflow = true;
                break;
            }
        }
        self
    }

    pub fn slots(mut self, slots: u16) -> Self {
        self.slots = slots;
        self
    }

    pub fn setup_time(mut self, duration: TickDuration) -> Self {
        self.setup_time = duration;
        self
    }

    pub fn start_delay(mut self, duration: TickDuration) -> Self {
        self.start_delay = duration;
        self
    }

    pub fn stop_delay(mut self, duration: TickDuration) -> Self {
        self.stop_delay = duration;
        self
    }

    pub fn slot_gap(mut self, duration: TickDuration) -> Self {
        self.slot_gap = duration;
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = parse_key(key);
        self
    }

    pub fn p2p(mut self, config: RadioConfig) -> Self {
        self.p2p = Some(config);
        self
    }

    pub fn flood(mut self, config: FloodConfig) -> Self {
        self.flood = Some(config);
        self
    }

    pub fn build(self) -> Result<TestPlan, PlanError> {
        if self.roster_overflow {
            return Err(PlanError::RosterTooLarge);
        }
        let roster = NodeRoster::new(self.nodes.iter().copied())?;
        if self.slots == 0 {
            return Err(PlanError::NoSlots);
        }
        let key = self.key?;

        let mode = match (self.p2p, self.flood) {
            (Some(_), Some(_)) => return Err(PlanError::ConflictingModes),
            (None, None) => return Err(PlanError::MissingMode),
            (Some(radio), None) => ModeConfig::P2p(radio),
            (None, Some(flood)) => ModeConfig::Flood(flood),
        };

        if let ModeConfig::Flood(FloodConfig {
            initiator: InitiatorPolicy::Fixed { initiator, .. },
            ..
        }) = mode
        {
            if !roster.contains(initiator) {
                return Err(PlanError::UnknownInitiator(initiator));
            }
        }

        let plan = TestPlan {
            roster,
            slots: self.slots,
            setup_time: self.setup_time,
            start_delay: self.start_delay,
            stop_delay: self.stop_delay,
            slot_gap: self.slot_gap,
            key,
            mode,
        };

        // Reject durations whose fixed part alone cannot be scheduled.
        ScheduleTiming::derive(&plan, TickDuration::ZERO)?;
        Ok(plan)
    }
}

pub(crate) fn parse_key(key: &str) -> Result<Key, PlanError> {
    if key.len() > MAX_KEY_LEN {
        return Err(PlanError::KeyTooLong(key.len()));
    }
    if let Some(&byte) = key.as_bytes().iter().find(|byte| !is_clean_byte(**byte)) {
        return Err(PlanError::InvalidKeyByte(byte));
    }
    let mut out = Key::new();
    out.push_str(key).map_err(|_| PlanError::KeyTooLong(key.len()))?;
    Ok(out)
}
