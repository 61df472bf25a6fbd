use std::io;
use std::path::PathBuf;

use linktest_core::{NodeId, PlanError};
use linktest_engine::EngineError;
use thiserror::Error;

/// Errors of a simulated run.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid plan: {0}")]
    Plan(#[from] PlanError),
    #[error("cannot read plan {}: {source}", path.display())]
    PlanRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed plan file: {0}")]
    PlanFormat(#[from] serde_json::Error),
    #[error("node {node} stopped: {source}")]
    Engine {
        node: NodeId,
        #[source]
        source: EngineError,
    },
    #[error("cannot spawn thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("thread {0} panicked")]
    Panicked(String),
}
