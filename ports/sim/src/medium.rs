//! Shared radio medium.
//!
//! Every simulated radio is an endpoint of one [`Ether`]. A transmitted frame
//! is delivered to each endpoint that is receiving on the same channel and has
//! a link from the sender in the [`LinkModel`]; loss and corruption are drawn
//! from a seeded generator so runs are reproducible.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use linktest_core::NodeId;
use linktest_hal::IrqMask;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::radio::{RadioIrq, RadioMode, SimRadio};

/// Interrupt handler of one endpoint.
pub type IrqLine = Arc<dyn Fn() + Send + Sync>;

/// Locks `mutex`, ignoring poisoning; simulation state stays usable after a
/// node thread panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Quality of a directed link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkQuality {
    pub rssi: i16,
    pub snr: i8,
    /// Probability that a frame is not received at all.
    pub loss: f64,
    /// Probability that a received frame fails its CRC.
    pub corruption: f64,
}

impl LinkQuality {
    pub const fn new(rssi: i16, snr: i8) -> Self {
        Self {
            rssi,
            snr,
            loss: 0.0,
            corruption: 0.0,
        }
    }

    pub fn with_loss(mut self, loss: f64) -> Self {
        self.loss = probability(loss);
        self
    }

    pub fn with_corruption(mut self, corruption: f64) -> Self {
        self.corruption = probability(corruption);
        self
    }

    /// A link that can carry a frame at all.
    pub fn is_usable(&self) -> bool {
        self.loss < 1.0
    }
}

impl Default for LinkQuality {
    fn default() -> Self {
        Self::new(-60, 10)
    }
}

/// Connectivity between nodes.
#[derive(Debug, Clone, Default)]
pub struct LinkModel {
    default: Option<LinkQuality>,
    links: HashMap<(NodeId, NodeId), Option<LinkQuality>>,
}

impl LinkModel {
    /// Every node hears every other node with `quality`.
    pub fn full_mesh(quality: LinkQuality) -> Self {
        Self {
            default: Some(quality),
            links: HashMap::new(),
        }
    }

    /// No links until added with [`with_link`](Self::with_link).
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Chain in the given order; each node only hears its neighbours.
    pub fn line<I>(nodes: I, quality: LinkQuality) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        let nodes: Vec<NodeId> = nodes.into_iter().collect();
        nodes
            .windows(2)
            .fold(Self::disconnected(), |model, pair| {
                model.with_link(pair[0], pair[1], quality)
            })
    }

    /// Symmetric link between `a` and `b`.
    pub fn with_link(self, a: NodeId, b: NodeId, quality: LinkQuality) -> Self {
        self.with_directed_link(a, b, quality)
            .with_directed_link(b, a, quality)
    }

    pub fn with_directed_link(mut self, from: NodeId, to: NodeId, quality: LinkQuality) -> Self {
        self.links.insert((from, to), Some(quality));
        self
    }

    /// Removes the link in both directions.
    pub fn without_link(mut self, a: NodeId, b: NodeId) -> Self {
        self.links.insert((a, b), None);
        self.links.insert((b, a), None);
        self
    }

    pub fn quality(&self, from: NodeId, to: NodeId) -> Option<LinkQuality> {
        if from == to {
            return None;
        }
        match self.links.get(&(from, to)) {
            Some(explicit) => *explicit,
            None => self.default,
        }
    }

    /// Whether `to` can hear `from` at all.
    pub fn connects(&self, from: NodeId, to: NodeId) -> bool {
        self.quality(from, to).is_some_and(|q| q.is_usable())
    }
}

/// Faults a test can inject into an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The radio drops to standby after delivering its next frame.
    LeaveRxAfterNextFrame,
    /// The interrupt line stays asserted.
    StuckIrqLine,
    /// `init` fails.
    FailInit,
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Faults {
    pub leave_rx_after_next_frame: bool,
    pub stuck_irq: bool,
    pub fail_init: bool,
}

#[derive(Debug)]
pub(crate) struct EndpointState {
    pub mode: RadioMode,
    pub channel: u32,
    pub rx_mask: IrqMask,
    pub pending: VecDeque<RadioIrq>,
    pub faults: Faults,
}

impl Default for EndpointState {
    fn default() -> Self {
        Self {
            mode: RadioMode::Sleep,
            channel: 0,
            rx_mask: IrqMask::NONE,
            pending: VecDeque::new(),
            faults: Faults::default(),
        }
    }
}

struct Endpoint {
    state: Arc<Mutex<EndpointState>>,
    irq: Option<IrqLine>,
}

struct Medium {
    model: LinkModel,
    rng: StdRng,
    endpoints: BTreeMap<NodeId, Endpoint>,
}

/// One flood as announced by its initiator.
#[derive(Debug, Clone)]
pub(crate) struct FloodRun {
    pub initiator: NodeId,
    pub payload: Vec<u8>,
    pub n_tx: u8,
    /// Nodes that joined before the flood started, with their relay delay.
    pub participants: BTreeMap<NodeId, u8>,
}

#[derive(Default)]
struct FloodBoard {
    started: u64,
    /// Receivers waiting for flood number `.0` with relay delay `.1`.
    waiting: BTreeMap<NodeId, (u64, u8)>,
    runs: VecDeque<(u64, FloodRun)>,
}

const KEPT_FLOOD_RUNS: usize = 8;

pub struct Ether {
    medium: Mutex<Medium>,
    floods: Mutex<FloodBoard>,
}

impl Ether {
    pub fn new(model: LinkModel, seed: u64) -> Arc<Self> {
        Arc::new(Self {
            medium: Mutex::new(Medium {
                model,
                rng: StdRng::seed_from_u64(seed),
                endpoints: BTreeMap::new(),
            }),
            floods: Mutex::new(FloodBoard::default()),
        })
    }

    /// Creates the radio of `node`. Attaching a node twice replaces its
    /// previous endpoint.
    pub fn attach(self: &Arc<Self>, node: NodeId) -> SimRadio {
        let state = Arc::new(Mutex::new(EndpointState::default()));
        lock(&self.medium).endpoints.insert(
            node,
            Endpoint {
                state: Arc::clone(&state),
                irq: None,
            },
        );
        SimRadio::new(node, Arc::clone(self), state)
    }

    /// Registers the interrupt handler of `node`'s radio.
    pub fn connect_irq(&self, node: NodeId, line: IrqLine) -> bool {
        match lock(&self.medium).endpoints.get_mut(&node) {
            Some(endpoint) => {
                endpoint.irq = Some(line);
                true
            }
            None => false,
        }
    }

    /// Drops every interrupt handler, releasing whatever they hold.
    pub fn disconnect_irqs(&self) {
        for endpoint in lock(&self.medium).endpoints.values_mut() {
            endpoint.irq = None;
        }
    }

    pub fn inject(&self, node: NodeId, fault: Fault) -> bool {
        let medium = lock(&self.medium);
        let Some(endpoint) = medium.endpoints.get(&node) else {
            return false;
        };
        let mut state = lock(&endpoint.state);
        match fault {
            Fault::LeaveRxAfterNextFrame => state.faults.leave_rx_after_next_frame = true,
            Fault::StuckIrqLine => state.faults.stuck_irq = true,
            Fault::FailInit => state.faults.fail_init = true,
        }
        true
    }

    pub fn quality(&self, from: NodeId, to: NodeId) -> Option<LinkQuality> {
        lock(&self.medium).model.quality(from, to)
    }

    pub fn connects(&self, from: NodeId, to: NodeId) -> bool {
        lock(&self.medium).model.connects(from, to)
    }

    /// Puts `payload` on the air from `from` and returns the number of
    /// endpoints that received it. Interrupt lines are raised after the
    /// medium is released.
    pub(crate) fn transmit(&self, from: NodeId, payload: &[u8]) -> usize {
        let mut lines: Vec<IrqLine> = Vec::new();
        let mut delivered = 0;
        {
            let mut medium = lock(&self.medium);
            let Medium {
                model,
                rng,
                endpoints,
            } = &mut *medium;
            let Some(sender) = endpoints.get(&from) else {
                return 0;
            };
            let channel = lock(&sender.state).channel;

            for (&to, endpoint) in endpoints.iter() {
                let Some(quality) = model.quality(from, to) else {
                    continue;
                };
                let mut state = lock(&endpoint.state);
                if state.mode != RadioMode::Rx || state.channel != channel {
                    continue;
                }
                if rng.gen_bool(probability(quality.loss)) {
                    log::trace!("frame {from} -> {to} lost");
                    continue;
                }
                let crc_error = rng.gen_bool(probability(quality.corruption));
                let mut frame = payload.to_vec();
                if crc_error {
                    if let Some(byte) = frame.last_mut() {
                        *byte ^= 0xFF;
                    }
                }
                if state.rx_mask.contains(IrqMask::RX_DONE) {
                    state.pending.push_back(RadioIrq::RxDone {
                        payload: frame,
                        rssi: quality.rssi,
                        snr: quality.snr,
                        crc_error,
                    });
                    lines.extend(endpoint.irq.clone());
                }
                if state.faults.leave_rx_after_next_frame {
                    state.faults.leave_rx_after_next_frame = false;
                    state.mode = RadioMode::Standby;
                }
                delivered += 1;
            }

            let mut state = lock(&sender.state);
            state.mode = RadioMode::Standby;
            state.pending.push_back(RadioIrq::TxDone);
            lines.extend(sender.irq.clone());
        }

        log::trace!("frame from {from} delivered to {delivered} nodes");
        for line in lines {
            line();
        }
        delivered
    }

    /// Registers `node` as a receiver of the next flood.
    pub(crate) fn flood_join(&self, node: NodeId, tx_delay: u8) -> u64 {
        let mut board = lock(&self.floods);
        let target = board.started + 1;
        board.waiting.insert(node, (target, tx_delay));
        target
    }

    /// Starts a flood and returns its number.
    pub(crate) fn flood_initiate(&self, initiator: NodeId, payload: &[u8], n_tx: u8) -> u64 {
        let mut board = lock(&self.floods);
        board.started += 1;
        let number = board.started;
        let participants = board
            .waiting
            .iter()
            .filter(|(node, (target, _))| *target == number && **node != initiator)
            .map(|(node, (_, delay))| (*node, *delay))
            .collect();
        board.runs.push_back((
            number,
            FloodRun {
                initiator,
                payload: payload.to_vec(),
                n_tx,
                participants,
            },
        ));
        while board.runs.len() > KEPT_FLOOD_RUNS {
            board.runs.pop_front();
        }
        number
    }

    pub(crate) fn flood_run(&self, number: u64) -> Option<FloodRun> {
        lock(&self.floods)
            .runs
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, run)| run.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(id: u16) -> NodeId {
        NodeId(id)
    }

    #[test]
    fn line_only_links_neighbours() {
        let model = LinkModel::line([n(1), n(2), n(3)], LinkQuality::default());
        assert!(model.connects(n(1), n(2)));
        assert!(model.connects(n(3), n(2)));
        assert!(!model.connects(n(1), n(3)));
        assert!(!model.connects(n(2), n(2)));
    }

    #[test]
    fn explicit_cut_overrides_mesh() {
        let model = LinkModel::full_mesh(LinkQuality::default()).without_link(n(1), n(2));
        assert!(!model.connects(n(2), n(1)));
        assert!(model.connects(n(1), n(3)));
    }

    #[test]
    fn probabilities_are_clamped() {
        let quality = LinkQuality::default().with_loss(3.0).with_corruption(f64::NAN);
        assert_eq!(quality.loss, 1.0);
        assert_eq!(quality.corruption, 0.0);
        assert!(!quality.is_usable());
    }
}
