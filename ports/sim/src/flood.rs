//! Simulated synchronous flooding.
//!
//! A flood is resolved on the link graph of the [`Ether`] rather than frame by
//! frame: when a receiver stops, it looks up the flood it joined and computes
//! its hop distance from the initiator. A relay with a transmit delay of `d`
//! hops forwards `d` hop slots late.

use std::collections::BTreeMap;
use std::sync::Arc;

use linktest_core::NodeId;
use linktest_hal::{Flood, FloodRole, FloodStats, HalError, HalResult};

use crate::airtime;
use crate::medium::{Ether, FloodRun};

/// Per-hop guard added to the frame airtime.
pub const HOP_GUARD_US: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Idle,
    Initiator { flood: u64, payload_len: u8 },
    Receiver { flood: u64 },
}

pub struct SimFlood {
    node: NodeId,
    ether: Arc<Ether>,
    num_hops: u8,
    modulation: Option<u8>,
    tx_delay: u8,
    session: Session,
}

impl SimFlood {
    /// Flood engine of `node`; receptions farther than `num_hops` are lost.
    pub fn new(node: NodeId, ether: Arc<Ether>, num_hops: u8) -> Self {
        Self {
            node,
            ether,
            num_hops,
            modulation: None,
            tx_delay: 0,
            session: Session::Idle,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn tx_delay(&self) -> u8 {
        self.tx_delay
    }

    fn receiver_stats(&self, run: &FloodRun, payload: &mut [u8]) -> FloodStats {
        let distances = hop_distances(&self.ether, run);
        let Some(&(hops, via)) = distances.get(&self.node) else {
            return FloodStats::default();
        };
        if hops > u32::from(self.num_hops) {
            log::debug!("node {} is {hops} hops out, beyond {}", self.node, self.num_hops);
            return FloodStats::default();
        }

        let heard = distances
            .iter()
            .filter(|(&other, &(reach, _))| {
                other != self.node
                    && reach <= u32::from(self.num_hops)
                    && self.ether.connects(other, self.node)
            })
            .count();
        let quality = self.ether.quality(via, self.node).unwrap_or_default();
        let len = run.payload.len().min(payload.len());
        payload[..len].copy_from_slice(&run.payload[..len]);

        FloodStats {
            rx_cnt: u8::try_from(heard).unwrap_or(u8::MAX).min(run.n_tx).max(1),
            rx_idx: u8::try_from(hops - 1).unwrap_or(u8::MAX),
            rx_started: u8::try_from(heard).unwrap_or(u8::MAX).max(1),
            rssi: quality.rssi,
            snr: quality.snr,
            payload_len: u8::try_from(len).unwrap_or(u8::MAX),
            t_ref_updated: true,
        }
    }

    fn initiator_stats(&self, run: &FloodRun, payload_len: u8) -> FloodStats {
        let distances = hop_distances(&self.ether, run);
        let relays = distances
            .iter()
            .filter(|(&node, &(hops, _))| {
                node != self.node
                    && hops <= u32::from(self.num_hops)
                    && self.ether.connects(self.node, node)
            })
            .count();
        FloodStats {
            rx_cnt: u8::try_from(relays).unwrap_or(u8::MAX),
            payload_len,
            ..FloodStats::default()
        }
    }
}

/// First-reception distance in hop slots of every node reached by `run`,
/// together with the neighbour it was first heard from.
fn hop_distances(ether: &Ether, run: &FloodRun) -> BTreeMap<NodeId, (u32, NodeId)> {
    let mut delays: BTreeMap<NodeId, u32> = run
        .participants
        .iter()
        .map(|(&node, &delay)| (node, u32::from(delay)))
        .collect();
    delays.insert(run.initiator, 0);

    let mut reached = BTreeMap::new();
    reached.insert(run.initiator, (0u32, run.initiator));
    for _ in 0..delays.len() {
        let mut changed = false;
        let snapshot: Vec<(NodeId, u32)> = reached.iter().map(|(&n, &(d, _))| (n, d)).collect();
        for (from, distance) in snapshot {
            let forward = distance + 1 + delays.get(&from).copied().unwrap_or(0);
            for &to in delays.keys() {
                if to == run.initiator || !ether.connects(from, to) {
                    continue;
                }
                let better = reached.get(&to).map_or(true, |&(d, _)| forward < d);
                if better {
                    reached.insert(to, (forward, from));
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    reached
}

impl Flood for SimFlood {
    fn configure(&mut self, rf_band: u8, tx_power: i8, modulation: u8) -> HalResult<()> {
        log::debug!(
            "node {} flood radio: band {rf_band}, {tx_power} dBm, modulation {modulation}",
            self.node
        );
        self.modulation = Some(modulation);
        Ok(())
    }

    fn set_tx_delay(&mut self, hops: u8) {
        self.tx_delay = hops;
    }

    fn start(&mut self, role: FloodRole<'_>, n_tx: u8, _slot_sync: bool) -> HalResult<()> {
        if self.modulation.is_none() {
            return Err(HalError::NotConfigured);
        }
        self.session = match role {
            FloodRole::Initiator { payload } => {
                let payload_len =
                    u8::try_from(payload.len()).map_err(|_| HalError::PayloadTooLong {
                        len: payload.len(),
                        max: usize::from(u8::MAX),
                    })?;
                Session::Initiator {
                    flood: self.ether.flood_initiate(self.node, payload, n_tx),
                    payload_len,
                }
            }
            FloodRole::Receiver => Session::Receiver {
                flood: self.ether.flood_join(self.node, self.tx_delay),
            },
        };
        Ok(())
    }

    fn stop(&mut self, payload: &mut [u8]) -> FloodStats {
        match core::mem::replace(&mut self.session, Session::Idle) {
            Session::Idle => FloodStats::default(),
            Session::Initiator { flood, payload_len } => self
                .ether
                .flood_run(flood)
                .map(|run| self.initiator_stats(&run, payload_len))
                .unwrap_or_default(),
            Session::Receiver { flood } => match self.ether.flood_run(flood) {
                Some(run) => self.receiver_stats(&run, payload),
                None => {
                    log::debug!("node {}: no flood started while listening", self.node);
                    FloodStats::default()
                }
            },
        }
    }

    fn flood_duration(&self, payload_len: u8, n_tx: u8, num_hops: u8) -> u32 {
        let modulation = self.modulation.unwrap_or_default();
        flood_duration_us(modulation, payload_len, n_tx, num_hops)
    }
}

/// Duration of a flood: enough hop slots for the last relay's last copy.
pub fn flood_duration_us(modulation: u8, payload_len: u8, n_tx: u8, num_hops: u8) -> u32 {
    let hop_slots = (u32::from(num_hops) + 2 * u32::from(n_tx.saturating_sub(1))).max(1);
    let hop_slot =
        airtime::time_on_air_us(&airtime::flood_modulation(modulation), payload_len) + HOP_GUARD_US;
    hop_slots.saturating_mul(hop_slot)
}
