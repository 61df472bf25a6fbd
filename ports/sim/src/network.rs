//! Multi-node runner.
//!
//! Each node gets its own scheduler thread, clock and tracer; all of them
//! count from one epoch. In point-to-point mode the radios are attached to
//! the shared [`Ether`] up front and their interrupt lines wired to a relay
//! before any node starts, so no frame can be lost to setup order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use linktest_core::{ModeConfig, NodeId, Tick, TestPlan};
use linktest_engine::{
    ActiveMode, DeferredRelay, DirectRelay, Emitter, EngineError, RadioLink, RoundScheduler,
    RunReport, WakeSignal,
};
use linktest_trace::{MemoryBackend, TraceBackend, TraceConfig, Tracer};

use crate::clock::StdClock;
use crate::error::SimError;
use crate::flood::SimFlood;
use crate::medium::{Ether, Fault, LinkModel, LinkQuality};
use crate::pins::{SimPin, SyncLine};
use crate::radio::SimRadio;

/// How radio interrupts reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RelayKind {
    /// Processed in the interrupt, latched while the radio is busy.
    Direct,
    /// Processed by a per-node thread that also runs the receive watchdog.
    #[default]
    Deferred,
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub links: LinkModel,
    pub seed: u64,
    pub relay: RelayKind,
    /// Time between spawning the nodes and releasing the sync line.
    pub release_after: Duration,
    pub timestamps: bool,
    /// Faults injected into radios once they are attached.
    pub faults: Vec<(NodeId, Fault)>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            links: LinkModel::full_mesh(LinkQuality::default()),
            seed: 0,
            relay: RelayKind::default(),
            release_after: Duration::from_millis(50),
            timestamps: true,
            faults: Vec::new(),
        }
    }
}

/// Result of one node.
#[derive(Debug)]
pub struct NodeOutcome {
    pub node: NodeId,
    pub result: Result<RunReport, EngineError>,
    pub round_edges: Vec<Tick>,
    pub slot_edges: Vec<Tick>,
}

impl NodeOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        self.result.as_ref().ok()
    }
}

type NodeMode = ActiveMode<SimRadio, SimFlood>;

struct NodeThread {
    node: NodeId,
    handle: JoinHandle<Result<RunReport, EngineError>>,
    round_pin: SimPin,
    slot_pin: SimPin,
}

pub struct SimNetwork {
    plan: TestPlan,
    config: SimConfig,
}

impl SimNetwork {
    pub fn new(plan: TestPlan, config: SimConfig) -> Self {
        Self { plan, config }
    }

    pub fn plan(&self) -> &TestPlan {
        &self.plan
    }

    /// Runs every node of the plan to completion, writing their records to
    /// `backend`.
    pub fn run<B>(&self, backend: B) -> Result<Vec<NodeOutcome>, SimError>
    where
        B: TraceBackend + Clone + 'static,
    {
        let clock = StdClock::new();
        let ether = Ether::new(self.config.links.clone(), self.config.seed);
        let sync = SyncLine::new();
        let stop = Arc::new(AtomicBool::new(false));

        let mut relays = Vec::new();
        let mut nodes = Vec::new();
        let spawned = self.spawn_all(&clock, &ether, &sync, &stop, backend, &mut relays, &mut nodes);

        if spawned.is_ok() {
            thread::sleep(self.config.release_after);
            log::info!("releasing sync line for {} nodes", nodes.len());
        }
        // Released on failure too, so already spawned nodes can finish.
        sync.release();

        let mut outcomes = Vec::with_capacity(nodes.len());
        let mut joined = Ok(());
        for node in nodes {
            match node.handle.join() {
                Ok(result) => {
                    if let Err(err) = &result {
                        log::error!("node {} failed: {err}", node.node);
                    }
                    outcomes.push(NodeOutcome {
                        node: node.node,
                        result,
                        round_edges: node.round_pin.rising_edges(),
                        slot_edges: node.slot_pin.rising_edges(),
                    });
                }
                Err(_) => joined = Err(SimError::Panicked(format!("node-{}", node.node))),
            }
        }

        stop.store(true, Ordering::Release);
        for (name, relay) in relays {
            if relay.join().is_err() {
                joined = Err(SimError::Panicked(name));
            }
        }
        ether.disconnect_irqs();

        spawned?;
        joined?;
        Ok(outcomes)
    }

    /// Runs the plan into memory and returns the outcomes with every trace line.
    pub fn run_captured(&self) -> Result<(Vec<NodeOutcome>, Vec<String>), SimError> {
        let backend = MemoryBackend::new();
        let outcomes = self.run(backend.clone())?;
        Ok((outcomes, backend.lines()))
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_all<B>(
        &self,
        clock: &StdClock,
        ether: &Arc<Ether>,
        sync: &SyncLine,
        stop: &Arc<AtomicBool>,
        backend: B,
        relays: &mut Vec<(String, JoinHandle<()>)>,
        nodes: &mut Vec<NodeThread>,
    ) -> Result<(), SimError>
    where
        B: TraceBackend + Clone + 'static,
    {
        for node in self.plan.roster().iter() {
            let trace = TraceConfig {
                include_timestamp: self.config.timestamps,
                origin: Some(node),
            };
            let hook = Tracer::with_epoch(trace, backend.clone(), clock.epoch())
                .into_handle()
                .hook();
            let emitter = Emitter::new(hook);

            let mode: NodeMode = match *self.plan.mode_config() {
                ModeConfig::P2p(_) => {
                    let link = Arc::new(RadioLink::new(ether.attach(node), emitter.clone()));
                    for (_, fault) in self.config.faults.iter().filter(|(n, _)| *n == node) {
                        ether.inject(node, *fault);
                    }
                    if let Some(relay) = self.wire_relay(ether, node, &link, stop)? {
                        relays.push(relay);
                    }
                    ActiveMode::from_plan(&self.plan, Some(link), None)
                }
                ModeConfig::Flood(config) => {
                    let flood = SimFlood::new(node, Arc::clone(ether), config.num_hops);
                    ActiveMode::from_plan(&self.plan, None, Some(flood))
                }
            }
            .map_err(|source| SimError::Engine { node, source })?;

            let round_pin = SimPin::new(*clock);
            let slot_pin = SimPin::new(*clock);
            let scheduler = RoundScheduler::new(self.plan.clone(), node, mode, *clock, sync.input())
                .with_pins(round_pin.clone(), slot_pin.clone())
                .with_emitter(emitter);

            let name = format!("node-{node}");
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    let mut scheduler = scheduler;
                    scheduler.run_rounds()
                })
                .map_err(|source| SimError::Spawn { name, source })?;
            nodes.push(NodeThread {
                node,
                handle,
                round_pin,
                slot_pin,
            });
        }
        Ok(())
    }

    fn wire_relay(
        &self,
        ether: &Ether,
        node: NodeId,
        link: &Arc<RadioLink<SimRadio>>,
        stop: &Arc<AtomicBool>,
    ) -> Result<Option<(String, JoinHandle<()>)>, SimError> {
        match self.config.relay {
            RelayKind::Direct => {
                let relay = DirectRelay::new(Arc::clone(link));
                ether.connect_irq(node, Arc::new(relay.irq_line()));
                Ok(None)
            }
            RelayKind::Deferred => {
                let relay = DeferredRelay::new(Arc::clone(link), Arc::new(WakeSignal::new()));
                ether.connect_irq(node, Arc::new(relay.irq_line()));
                let stop = Arc::clone(stop);
                let name = format!("relay-{node}");
                let handle = thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || relay.run_until(&stop))
                    .map_err(|source| SimError::Spawn {
                        name: name.clone(),
                        source,
                    })?;
                Ok(Some((name, handle)))
            }
        }
    }
}
