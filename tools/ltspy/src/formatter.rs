//! Report formatting
//!
//! Renders evaluations as colored text tables or JSON.

use colored::{ColoredString, Colorize};

use crate::duration::DurationEstimate;
use crate::stats::{Evaluation, Matrix, ModeStats};

const CELL_WIDTH: usize = 7;

#[derive(Debug, Clone, Copy)]
enum CellStyle {
    /// Higher is better, in 0..=1.
    Ratio,
    /// Lower is better, in 0..=1.
    ErrorRatio,
    Plain,
}

pub struct ReportFormatter {
    json_format: bool,
}

impl ReportFormatter {
    pub fn new(json_format: bool) -> Self {
        Self { json_format }
    }

    pub fn format_evaluation(&self, eval: &Evaluation) -> Result<String, serde_json::Error> {
        if self.json_format {
            return serde_json::to_string_pretty(eval).map(|json| json + "\n");
        }

        let mut out = String::new();
        let test = &eval.test;
        out.push_str(&format!(
            "{} {} nodes, {} slots per round, key {}\n",
            "run".bold(),
            eval.nodes.len(),
            test.num_tx,
            test.key
        ));
        if eval.skipped_lines > 0 {
            out.push_str(&format!(
                "{}\n",
                format!("{} undecodable lines skipped", eval.skipped_lines).yellow()
            ));
        }

        match &eval.mode {
            ModeStats::P2p { radio, stats } => {
                out.push_str(&format!(
                    "{} {} {} Hz, {} dBm\n\n",
                    "p2p".bold(),
                    radio.modulation,
                    radio.frequency,
                    radio.tx_power
                ));
                out.push_str(&table("PRR", &stats.prr, CellStyle::Ratio, 2));
                out.push_str(&table("CRC errors", &stats.crc_error, CellStyle::ErrorRatio, 2));
                out.push_str(&table("RSSI [dBm]", &stats.rssi, CellStyle::Plain, 0));
                out.push_str(&table("SNR [dB]", &stats.snr, CellStyle::Plain, 0));
                out.push_str(&table("Path loss [dB]", &stats.pathloss, CellStyle::Plain, 0));
            }
            ModeStats::Flood { flood, stats } => {
                out.push_str(&format!(
                    "{} modulation {}, n_tx {}, {} hops\n\n",
                    "flood".bold(),
                    flood.modulation,
                    flood.n_tx,
                    flood.num_hops
                ));
                let rows = if stats.delayed_tx { "delayed" } else { "initiator" };
                out.push_str(&table(
                    &format!("Floods received (rows: {rows})"),
                    &stats.received,
                    CellStyle::Plain,
                    0,
                ));
                out.push_str(&table("Hop distance", &stats.hop_distance, CellStyle::Plain, 1));
                out.push_str(&table(
                    "Hop distance std",
                    &stats.hop_distance_std,
                    CellStyle::Plain,
                    2,
                ));
            }
        }
        Ok(out)
    }

    pub fn format_duration(&self, estimate: &DurationEstimate) -> Result<String, serde_json::Error> {
        if self.json_format {
            return serde_json::to_string_pretty(estimate).map(|json| json + "\n");
        }
        Ok(format!(
            "slot time    {} ms\nslot period  {} ms\nround period {} ms\nrounds       {}\n{} {:.3} s\n",
            estimate.slot_time_ms,
            estimate.slot_period_ms,
            estimate.round_period_ms,
            estimate.rounds,
            "duration    ".bold(),
            estimate.total_secs()
        ))
    }
}

fn table(title: &str, matrix: &Matrix, style: CellStyle, precision: usize) -> String {
    let mut out = format!("{}\n", title.bright_cyan().bold());
    out.push_str(&format!("{:>width$}", "tx\\rx", width = CELL_WIDTH));
    for node in &matrix.nodes {
        out.push_str(&format!("{:>width$}", node.raw(), width = CELL_WIDTH));
    }
    out.push('\n');

    for (row, cells) in matrix.nodes.iter().zip(&matrix.cells) {
        out.push_str(&format!("{:>width$}", row.raw(), width = CELL_WIDTH));
        for cell in cells {
            out.push_str(&cell_text(*cell, style, precision).to_string());
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

fn cell_text(value: Option<f64>, style: CellStyle, precision: usize) -> ColoredString {
    let Some(value) = value else {
        return format!("{:>width$}", "-", width = CELL_WIDTH).dimmed();
    };
    let text = format!("{value:>width$.precision$}", width = CELL_WIDTH);
    let goodness = match style {
        CellStyle::Ratio => value,
        CellStyle::ErrorRatio => 1.0 - value,
        CellStyle::Plain => return text.normal(),
    };
    if goodness >= 0.9 {
        text.green()
    } else if goodness >= 0.5 {
        text.yellow()
    } else {
        text.red()
    }
}
