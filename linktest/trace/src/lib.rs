//! Link-test record tracing with pluggable backends.
//!
//! Every [`LogEvent`] a node produces is stamped with a sequence number, an
//! optional timestamp and the emitting node, then written as one JSON object
//! per line:
//!
//! ```text
//! {"seq":3,"ts_us":1520311,"origin":2,"type":"StartOfRound","round":0,"node":1}
//! ```
//!
//! The same line format is read back by [`parse_line`], which also accepts the
//! bare event objects a firmware prints over its serial console.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::{ToSocketAddrs, UdpSocket};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use linktest_core::{LogEvent, NodeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod parse;

pub use parse::{parse_line, ParseError};

/// Configuration for the tracer.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub include_timestamp: bool,
    /// Node stamped into every record as `origin`.
    pub origin: Option<NodeId>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            include_timestamp: true,
            origin: None,
        }
    }
}

impl TraceConfig {
    pub fn for_node(node: NodeId) -> Self {
        Self {
            origin: Some(node),
            ..Self::default()
        }
    }
}

/// A single traced record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    #[serde(default)]
    pub seq: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts_us: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<NodeId>,
    #[serde(flatten)]
    pub event: LogEvent,
}

/// Errors that can occur while emitting records.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(#[from] io::Error),
    #[error("trace backend lock poisoned")]
    Poisoned,
}

/// Backend trait that consumes encoded record lines (without terminator).
pub trait TraceBackend: Send + Sync {
    fn write_line(&self, line: &str) -> Result<(), TraceError>;
}

impl TraceBackend for Box<dyn TraceBackend> {
    fn write_line(&self, line: &str) -> Result<(), TraceError> {
        (**self).write_line(line)
    }
}

/// Backend that writes newline-terminated records to any `Write` implementation.
pub struct WriterBackend<W: Write + Send + 'static> {
    writer: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> WriterBackend<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

impl<W: Write + Send + 'static> Clone for WriterBackend<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W: Write + Send + 'static> TraceBackend for WriterBackend<W> {
    fn write_line(&self, line: &str) -> Result<(), TraceError> {
        let mut guard = self.writer.lock().map_err(|_| TraceError::Poisoned)?;
        guard.write_all(line.as_bytes())?;
        guard.write_all(b"\n")?;
        guard.flush().map_err(TraceError::from)
    }
}

/// Convenience backend that writes records to stdout.
pub fn stdout_backend() -> WriterBackend<io::Stdout> {
    WriterBackend::new(io::stdout())
}

/// Backend that appends records to a file, creating it if needed.
pub fn file_backend<P: AsRef<Path>>(path: P) -> io::Result<WriterBackend<BufWriter<File>>> {
    let file = File::options().create(true).append(true).open(path)?;
    Ok(WriterBackend::new(BufWriter::new(file)))
}

/// Backend that keeps every line in memory.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Captured lines decoded back into records; undecodable lines are skipped.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.lines()
            .iter()
            .filter_map(|line| parse_line(line).ok())
            .collect()
    }
}

impl TraceBackend for MemoryBackend {
    fn write_line(&self, line: &str) -> Result<(), TraceError> {
        let mut guard = self.lines.lock().map_err(|_| TraceError::Poisoned)?;
        guard.push(line.to_owned());
        Ok(())
    }
}

/// Backend that streams records over a UDP socket, one datagram per line.
#[derive(Clone)]
pub struct UdpBackend {
    socket: Arc<UdpSocket>,
}

impl UdpBackend {
    /// Binds a local UDP socket and connects it to the provided remote address.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(addr)?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }
}

impl TraceBackend for UdpBackend {
    fn write_line(&self, line: &str) -> Result<(), TraceError> {
        self.socket
            .send(line.as_bytes())
            .map(|_| ())
            .map_err(TraceError::from)
    }
}

/// Record encoder for one node.
#[derive(Debug)]
pub struct Tracer<B: TraceBackend> {
    backend: B,
    cfg: TraceConfig,
    seq: u32,
    epoch: Instant,
}

impl<B: TraceBackend> Tracer<B> {
    pub fn new(cfg: TraceConfig, backend: B) -> Self {
        Self::with_epoch(cfg, backend, Instant::now())
    }

    /// Tracer whose timestamps count from `epoch`, so that several nodes
    /// sharing a backend produce comparable times.
    pub fn with_epoch(cfg: TraceConfig, backend: B, epoch: Instant) -> Self {
        Self {
            backend,
            cfg,
            seq: 0,
            epoch,
        }
    }

    pub fn into_handle(self) -> TracerHandle<B> {
        TracerHandle {
            inner: Arc::new(Mutex::new(self)),
        }
    }

    pub fn record(&mut self, event: &LogEvent) -> Result<TraceRecord, TraceError> {
        self.seq = self.seq.wrapping_add(1);
        let ts_us = self
            .cfg
            .include_timestamp
            .then(|| u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX));

        let record = TraceRecord {
            seq: self.seq,
            ts_us,
            origin: self.cfg.origin,
            event: event.clone(),
        };

        let line = serde_json::to_string(&record)?;
        log::trace!("trace {} seq={}", event.name(), record.seq);
        self.backend.write_line(&line)?;
        Ok(record)
    }
}

/// Shared handle to a [`Tracer`].
pub struct TracerHandle<B: TraceBackend> {
    inner: Arc<Mutex<Tracer<B>>>,
}

impl<B: TraceBackend> Clone for TracerHandle<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: TraceBackend + 'static> TracerHandle<B> {
    pub fn emit(&self, event: &LogEvent) -> Result<TraceRecord, TraceError> {
        let mut guard = self.inner.lock().map_err(|_| TraceError::Poisoned)?;
        guard.record(event)
    }

    pub fn hook(&self) -> EventHook {
        let inner = Arc::clone(&self.inner);
        Arc::new(move |event| {
            let mut guard = inner.lock().map_err(|_| TraceError::Poisoned)?;
            guard.record(event).map(|_| ())
        })
    }
}

/// Sink the scheduling engine emits records into.
pub type EventHook = Arc<dyn Fn(&LogEvent) -> Result<(), TraceError> + Send + Sync>;
