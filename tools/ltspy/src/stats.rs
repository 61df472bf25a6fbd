//! Link statistics derived from a [`LogSet`].
//!
//! Rows of every matrix are the node owning a round (the transmitter in
//! point-to-point mode, the initiator or delayed relay in flood mode) and
//! columns the node whose records were evaluated. Cells without data are
//! `None`.

use linktest_core::{FloodConfigRecord, LogEvent, NodeId, RadioConfigRecord, TestConfigRecord};
use serde::Serialize;

use crate::error::EvalError;
use crate::parser::LogSet;

/// Square matrix indexed by node id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    pub nodes: Vec<NodeId>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl Matrix {
    pub fn new(nodes: &[NodeId]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            cells: vec![vec![None; nodes.len()]; nodes.len()],
        }
    }

    fn index(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    pub fn get(&self, row: NodeId, col: NodeId) -> Option<f64> {
        let (r, c) = (self.index(row)?, self.index(col)?);
        self.cells[r][c]
    }

    pub fn set(&mut self, row: NodeId, col: NodeId, value: Option<f64>) {
        if let (Some(r), Some(c)) = (self.index(row), self.index(col)) {
            self.cells[r][c] = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct P2pStats {
    /// Packet reception ratio.
    pub prr: Matrix,
    /// Received packets with a CRC error per transmitted packet.
    pub crc_error: Matrix,
    /// Mean RSSI of correctly received packets, dBm.
    pub rssi: Matrix,
    pub snr: Matrix,
    /// Transmit power minus mean RSSI, dB.
    pub pathloss: Matrix,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloodLinkStats {
    /// Floods received from the round's initiator.
    pub received: Matrix,
    /// Mean hop distance (`rx_idx + 1`) of received floods.
    pub hop_distance: Matrix,
    /// Population standard deviation of the hop distance.
    pub hop_distance_std: Matrix,
    /// `true` when rows are delayed relays rather than initiators.
    pub delayed_tx: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ModeStats {
    P2p {
        radio: RadioConfigRecord,
        stats: P2pStats,
    },
    Flood {
        flood: FloodConfigRecord,
        stats: FloodLinkStats,
    },
}

/// Everything `ltspy eval` reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub test: TestConfigRecord,
    pub nodes: Vec<NodeId>,
    #[serde(flatten)]
    pub mode: ModeStats,
    /// Lines that looked like records but could not be decoded.
    pub skipped_lines: usize,
}

/// Checks the logs and computes the link matrices of the run.
pub fn evaluate(logs: &LogSet) -> Result<Evaluation, EvalError> {
    if logs.is_empty() {
        return Err(EvalError::NoRecords);
    }
    let configs = logs.configs()?;
    logs.check_rounds()?;
    let nodes = logs.nodes();

    let mode = match (configs.test.p2p_mode, configs.test.flood_mode) {
        (true, false) => {
            let radio = configs.radio.ok_or(EvalError::MissingConfig {
                node: nodes[0],
                record: "RadioConfig",
            })?;
            let stats = p2p_stats(logs, &nodes, &configs.test, &radio);
            ModeStats::P2p { radio, stats }
        }
        (false, true) => {
            let flood = configs.flood.ok_or(EvalError::MissingConfig {
                node: nodes[0],
                record: "FloodConfig",
            })?;
            let stats = flood_stats(logs, &nodes, flood.delay_tx != 0);
            ModeStats::Flood { flood, stats }
        }
        _ => return Err(EvalError::InvalidMode),
    };

    Ok(Evaluation {
        test: configs.test,
        nodes,
        mode,
        skipped_lines: logs.skipped(),
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

fn p2p_stats(
    logs: &LogSet,
    nodes: &[NodeId],
    test: &TestConfigRecord,
    radio: &RadioConfigRecord,
) -> P2pStats {
    let mut stats = P2pStats {
        prr: Matrix::new(nodes),
        crc_error: Matrix::new(nodes),
        rssi: Matrix::new(nodes),
        snr: Matrix::new(nodes),
        pathloss: Matrix::new(nodes),
    };

    for &tx in nodes {
        let num_tx = logs
            .round_rows(tx, tx)
            .iter()
            .filter(|event| matches!(event, LogEvent::TxDone))
            .count();
        if num_tx != usize::from(test.num_tx) {
            log::warn!(
                "node {tx} completed {num_tx} transmissions in its round, expected {}",
                test.num_tx
            );
        }
        if num_tx == 0 {
            continue;
        }

        for &rx in nodes.iter().filter(|&&rx| rx != tx) {
            let mut received = Vec::new();
            let mut crc_errors = 0usize;
            for event in logs.round_rows(rx, tx) {
                if let LogEvent::RxDone(record) = event {
                    if record.crc_error {
                        crc_errors += 1;
                    } else if record.key == test.key {
                        received.push(record);
                    }
                }
            }
            let rssi: Vec<f64> = received.iter().map(|r| f64::from(r.rssi)).collect();
            let snr: Vec<f64> = received.iter().map(|r| f64::from(r.snr)).collect();
            let mean_rssi = mean(&rssi);

            stats
                .prr
                .set(tx, rx, Some(received.len() as f64 / num_tx as f64));
            stats
                .crc_error
                .set(tx, rx, Some(crc_errors as f64 / num_tx as f64));
            stats.rssi.set(tx, rx, mean_rssi);
            stats.snr.set(tx, rx, mean(&snr));
            stats.pathloss.set(
                tx,
                rx,
                mean_rssi.map(|rssi| f64::from(radio.tx_power) - rssi),
            );
        }
    }
    stats
}

fn flood_stats(logs: &LogSet, nodes: &[NodeId], delayed_tx: bool) -> FloodLinkStats {
    let mut stats = FloodLinkStats {
        received: Matrix::new(nodes),
        hop_distance: Matrix::new(nodes),
        hop_distance_std: Matrix::new(nodes),
        delayed_tx,
    };

    for &round_node in nodes {
        for &rx in nodes {
            let hops: Vec<f64> = logs
                .round_rows(rx, round_node)
                .into_iter()
                .filter_map(|event| match event {
                    LogEvent::FloodDone(done) if done.rx_cnt > 0 && !done.is_initiator => {
                        Some(f64::from(done.rx_idx) + 1.0)
                    }
                    _ => None,
                })
                .collect();
            stats
                .received
                .set(round_node, rx, Some(hops.len() as f64));
            stats.hop_distance.set(round_node, rx, mean(&hops));
            stats.hop_distance_std.set(round_node, rx, std_dev(&hops));
        }
    }
    stats
}
