//! Multi-hop flood capability

use crate::error::HalResult;

/// Part a node plays in one flood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodRole<'a> {
    Initiator { payload: &'a [u8] },
    Receiver,
}

impl FloodRole<'_> {
    pub fn is_initiator(&self) -> bool {
        matches!(self, FloodRole::Initiator { .. })
    }
}

/// Statistics of the last flood, valid after [`Flood::stop`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloodStats {
    /// Number of copies received.
    pub rx_cnt: u8,
    /// Index of the first received copy.
    pub rx_idx: u8,
    /// Number of receptions that were started (preamble detected).
    pub rx_started: u8,
    pub rssi: i16,
    pub snr: i8,
    pub payload_len: u8,
    /// Whether the shared time reference was updated from this flood.
    pub t_ref_updated: bool,
}

/// Synchronous flooding engine.
pub trait Flood {
    /// One-time radio setup for floods.
    fn configure(&mut self, rf_band: u8, tx_power: i8, modulation: u8) -> HalResult<()>;

    /// Delays this node's retransmissions by `hops` hop slots; 0 disables.
    fn set_tx_delay(&mut self, hops: u8);

    fn start(&mut self, role: FloodRole<'_>, n_tx: u8, slot_sync: bool) -> HalResult<()>;

    /// Ends the flood. A received payload is copied into `payload`.
    fn stop(&mut self, payload: &mut [u8]) -> FloodStats;

    /// Duration of a whole flood in microseconds.
    fn flood_duration(&self, payload_len: u8, n_tx: u8, num_hops: u8) -> u32;
}
