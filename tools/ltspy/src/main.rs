use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linktest_core::TickDuration;
use log::LevelFilter;
use ltspy::{estimate, evaluate, LogSet, ReportFormatter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluates link-test traces")]
struct Opts {
    #[command(subcommand)]
    command: Command,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Link matrices of a completed run.
    Eval {
        /// Trace files; files named after a node id supply the origin of
        /// records that lack one.
        #[arg(required = true, value_name = "LOG")]
        logs: Vec<PathBuf>,
    },
    /// Round period and total duration of a plan.
    Duration {
        #[arg(long, value_name = "FILE")]
        plan: PathBuf,

        /// Slot time to use instead of the computed airtime.
        #[arg(long, value_name = "MS")]
        slot_time_ms: Option<u32>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();

    let opts = Opts::parse();
    if opts.no_color {
        colored::control::set_override(false);
    }
    let formatter = ReportFormatter::new(opts.json);

    match opts.command {
        Command::Eval { logs } => {
            let mut set = LogSet::new();
            for path in &logs {
                set.read_file(path)?;
            }
            let evaluation = evaluate(&set).context("evaluating traces")?;
            print!("{}", formatter.format_evaluation(&evaluation)?);
        }
        Command::Duration { plan, slot_time_ms } => {
            let plan = linktest_sim::load_plan(&plan)?;
            let estimate = estimate(&plan, slot_time_ms.map(TickDuration::from_millis))?;
            print!("{}", formatter.format_duration(&estimate)?);
        }
    }
    Ok(())
}
