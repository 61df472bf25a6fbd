use std::io;
use std::path::PathBuf;

use linktest_core::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: record has no origin and none can be derived from the file")]
    MissingOrigin { line: usize },
    #[error("no records found")]
    NoRecords,
    #[error("node {node} logged no {record} record")]
    MissingConfig { node: NodeId, record: &'static str },
    #[error("node {node} logged a {record} record that differs from node {reference}")]
    InconsistentConfig {
        node: NodeId,
        reference: NodeId,
        record: &'static str,
    },
    #[error("test config selects neither or both modes")]
    InvalidMode,
    #[error("node {origin}: round of node {found} closed while round of node {expected} was open")]
    RoundMismatch {
        origin: NodeId,
        expected: NodeId,
        found: NodeId,
    },
    #[error("node {origin}: round of node {node} started inside another round")]
    NestedRound { origin: NodeId, node: NodeId },
    #[error("node {origin}: round of node {node} ended without starting")]
    UnopenedRound { origin: NodeId, node: NodeId },
    #[error(transparent)]
    Plan(#[from] linktest_sim::SimError),
    #[error("invalid timing: {0}")]
    Timing(#[from] linktest_core::PlanError),
}
