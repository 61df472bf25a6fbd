//! Trace log loading.
//!
//! Accepts the JSON lines written by the tracer as well as raw serial dumps
//! where each record is embedded somewhere in a console line. Records without
//! an `origin` are attributed to the node named by the file, e.g. `3.log`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use linktest_core::{FloodConfigRecord, LogEvent, NodeId, RadioConfigRecord, TestConfigRecord};
use linktest_trace::{parse_line, ParseError};

use crate::error::EvalError;

/// Records of every node, each in the order it was logged.
#[derive(Debug, Clone, Default)]
pub struct LogSet {
    nodes: BTreeMap<NodeId, Vec<LogEvent>>,
    skipped: usize,
}

impl LogSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `text`, attributing records without an origin to `fallback`.
    pub fn push_text(&mut self, text: &str, fallback: Option<NodeId>) -> Result<(), EvalError> {
        for (index, line) in text.lines().enumerate() {
            let record = match parse_line(line) {
                Ok(record) => record,
                Err(ParseError::NoRecord) => continue,
                Err(err) => {
                    log::warn!("line {}: {err}", index + 1);
                    self.skipped += 1;
                    continue;
                }
            };
            let origin = record
                .origin
                .or(fallback)
                .ok_or(EvalError::MissingOrigin { line: index + 1 })?;
            self.nodes.entry(origin).or_default().push(record.event);
        }
        Ok(())
    }

    pub fn read_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), EvalError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| EvalError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let fallback = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.parse::<u16>().ok())
            .map(NodeId);
        self.push_text(&text, fallback)
    }

    pub fn from_text(text: &str) -> Result<Self, EvalError> {
        let mut set = Self::new();
        set.push_text(text, None)?;
        Ok(set)
    }

    /// Nodes that logged at least one record, ascending.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Lines that looked like records but failed to decode.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn events(&self, node: NodeId) -> &[LogEvent] {
        self.nodes.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Records `node` logged during the round owned by `round_node`.
    pub fn round_rows(&self, node: NodeId, round_node: NodeId) -> Vec<&LogEvent> {
        let mut rows = Vec::new();
        let mut inside = false;
        for event in self.events(node) {
            match event {
                LogEvent::StartOfRound(marker) => {
                    if marker.node == round_node {
                        inside = true;
                    }
                }
                LogEvent::EndOfRound(marker) => {
                    if marker.node == round_node {
                        break;
                    }
                }
                event if inside => rows.push(event),
                _ => {}
            }
        }
        rows
    }

    /// Verifies that every node's rounds are opened and closed pairwise.
    pub fn check_rounds(&self) -> Result<(), EvalError> {
        for (&origin, events) in &self.nodes {
            let mut open: Option<NodeId> = None;
            for event in events {
                match (event, open) {
                    (LogEvent::StartOfRound(marker), None) => open = Some(marker.node),
                    (LogEvent::StartOfRound(marker), Some(_)) => {
                        return Err(EvalError::NestedRound {
                            origin,
                            node: marker.node,
                        })
                    }
                    (LogEvent::EndOfRound(marker), Some(expected)) if marker.node == expected => {
                        open = None
                    }
                    (LogEvent::EndOfRound(marker), Some(expected)) => {
                        return Err(EvalError::RoundMismatch {
                            origin,
                            expected,
                            found: marker.node,
                        })
                    }
                    (LogEvent::EndOfRound(marker), None) => {
                        return Err(EvalError::UnopenedRound {
                            origin,
                            node: marker.node,
                        })
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Configuration every node logged, checked for agreement.
    pub fn configs(&self) -> Result<RunConfigs, EvalError> {
        let mut reference: Option<(NodeId, RunConfigs)> = None;
        for node in self.nodes() {
            let configs = self.configs_of(node)?;
            match &reference {
                None => reference = Some((node, configs)),
                Some((first, expected)) => {
                    let differing = if configs.test != expected.test {
                        Some("TestConfig")
                    } else if configs.radio != expected.radio {
                        Some("RadioConfig")
                    } else if configs.flood != expected.flood {
                        Some("FloodConfig")
                    } else {
                        None
                    };
                    if let Some(record) = differing {
                        return Err(EvalError::InconsistentConfig {
                            node,
                            reference: *first,
                            record,
                        });
                    }
                }
            }
        }
        reference
            .map(|(_, configs)| configs)
            .ok_or(EvalError::NoRecords)
    }

    fn configs_of(&self, node: NodeId) -> Result<RunConfigs, EvalError> {
        let mut test = None;
        let mut radio = None;
        let mut flood = None;
        for event in self.events(node) {
            match event {
                LogEvent::TestConfig(record) if test.is_none() => test = Some(record.clone()),
                LogEvent::RadioConfig(record) if radio.is_none() => radio = Some(record.clone()),
                LogEvent::FloodConfig(record) if flood.is_none() => flood = Some(record.clone()),
                _ => {}
            }
            if test.is_some() && (radio.is_some() || flood.is_some()) {
                break;
            }
        }
        let test = test.ok_or(EvalError::MissingConfig {
            node,
            record: "TestConfig",
        })?;
        Ok(RunConfigs { test, radio, flood })
    }
}

/// Configuration records of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfigs {
    pub test: TestConfigRecord,
    pub radio: Option<RadioConfigRecord>,
    pub flood: Option<FloodConfigRecord>,
}
