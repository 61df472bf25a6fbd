use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Builder;
use linktest_sim::{
    load_plan, LinkModel, LinkQuality, NodeOutcome, RelayKind, SimConfig, SimError, SimNetwork,
};
use linktest_trace::{file_backend, stdout_backend, TraceBackend, UdpBackend};
use log::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Topology {
    /// Every node hears every other node.
    Mesh,
    /// Nodes form a chain in roster order.
    Line,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs a link-test plan on simulated radios")]
struct Opts {
    /// JSON test plan.
    #[arg(long, value_name = "FILE")]
    plan: PathBuf,

    /// Append trace lines to a file instead of printing them.
    #[arg(long, value_name = "FILE", conflicts_with = "udp")]
    out: Option<PathBuf>,

    /// Stream trace lines as UDP datagrams.
    #[arg(long, value_name = "ADDR")]
    udp: Option<String>,

    #[arg(long, value_enum, default_value_t = Topology::Mesh)]
    topology: Topology,

    #[arg(long, default_value_t = -60, allow_hyphen_values = true)]
    rssi: i16,

    #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
    snr: i8,

    /// Frame loss probability per link.
    #[arg(long, default_value_t = 0.0)]
    loss: f64,

    /// Probability that a received frame fails its CRC.
    #[arg(long, default_value_t = 0.0)]
    corruption: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = RelayKind::Deferred)]
    relay: RelayKind,

    /// Leave timestamps out of trace lines.
    #[arg(long)]
    no_timestamps: bool,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let level = match opts.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new().filter_level(level).parse_default_env().init();

    ctrlc::set_handler(|| {
        log::warn!("interrupted, aborting run");
        process::exit(130);
    })
    .context("installing Ctrl-C handler")?;

    let plan = load_plan(&opts.plan)?;
    let quality = LinkQuality::new(opts.rssi, opts.snr)
        .with_loss(opts.loss)
        .with_corruption(opts.corruption);
    let links = match opts.topology {
        Topology::Mesh => LinkModel::full_mesh(quality),
        Topology::Line => LinkModel::line(plan.roster().iter(), quality),
    };
    log::info!(
        "{} plan: {} nodes, {} slots per round",
        plan.mode(),
        plan.rounds(),
        plan.slots()
    );

    let network = SimNetwork::new(
        plan,
        SimConfig {
            links,
            seed: opts.seed,
            relay: opts.relay,
            timestamps: !opts.no_timestamps,
            ..SimConfig::default()
        },
    );

    let outcomes = if let Some(addr) = &opts.udp {
        let backend = UdpBackend::connect(addr.as_str())
            .with_context(|| format!("connecting trace socket to {addr}"))?;
        run(&network, backend)?
    } else if let Some(path) = &opts.out {
        let backend = file_backend(path)
            .with_context(|| format!("opening trace file {}", path.display()))?;
        run(&network, backend)?
    } else {
        run(&network, stdout_backend())?
    };

    summarize(outcomes)
}

fn run<B: TraceBackend + Clone + 'static>(
    network: &SimNetwork,
    backend: B,
) -> Result<Vec<NodeOutcome>, SimError> {
    network.run(backend)
}

fn summarize(outcomes: Vec<NodeOutcome>) -> Result<()> {
    let mut failed = 0;
    for outcome in outcomes {
        let node = outcome.node;
        match outcome.result.map_err(|source| SimError::Engine { node, source }) {
            Ok(report) => log::info!(
                "node {node}: {} rounds, {} overruns",
                report.rounds(),
                report.overruns.len()
            ),
            Err(err) => {
                log::error!("{err}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} nodes failed");
    }
    Ok(())
}
