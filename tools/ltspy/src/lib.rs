//! Host-side evaluation of link-test traces.
//!
//! Loads the records every node logged during a run, checks that the nodes
//! agree on the configuration and that rounds are properly delimited, and
//! condenses them into per-link matrices: packet reception ratio, CRC error
//! ratio, RSSI, SNR and path loss for point-to-point runs, reception count and
//! hop distance for flood runs.

mod duration;
mod error;
mod formatter;
mod parser;
mod stats;

pub use duration::{
    estimate, slot_time, DurationEstimate, FIRMWARE_STARTUP_MS, SLACK_MS, SYNC_DELAY_MS,
};
pub use error::EvalError;
pub use formatter::ReportFormatter;
pub use parser::{LogSet, RunConfigs};
pub use stats::{evaluate, Evaluation, FloodLinkStats, Matrix, ModeStats, P2pStats};

#[cfg(test)]
mod tests;
