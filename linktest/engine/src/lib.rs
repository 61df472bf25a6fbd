//! # linktest-engine
//!
//! Round/slot scheduling engine for multi-node wireless link tests.
//!
//! A node waits for a shared synchronization edge, reads the clock exactly
//! once to obtain its anchor and from then on derives every deadline by adding
//! fixed offsets to that anchor, so nodes started by the same edge stay
//! aligned over arbitrarily many rounds.
//!
//! ## Module Overview
//! - [`scheduler`] – round lifecycle, synchronization wait and heartbeat.
//! - [`dispatch`]  – per-slot hand-off to the active strategy.
//! - [`strategy`]  – point-to-point and flood mode strategies.
//! - [`link`]      – exclusive radio ownership and interrupt-to-record translation.
//! - [`relay`]     – direct and deferred radio interrupt relays with watchdog.
//! - [`sync`]      – mutex and wake-signal primitives for `std` and `no_std`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod dispatch;
pub mod error;
pub mod link;
pub mod relay;
pub mod scheduler;
pub mod strategy;
pub mod sync;
pub mod trace;

pub use error::EngineError;
pub use link::{IrqOutcome, RadioCell, RadioLink, WatchdogAction};
pub use relay::{DeferredRelay, DirectRelay, ServiceReport, PROCESS_WAIT};
pub use scheduler::{RoundScheduler, RunReport};
pub use strategy::{ActiveMode, FloodStrategy, ModeStrategy, NoFlood, P2pStrategy, SlotContext};
pub use trace::{Emitter, EventHook, TraceError};

#[cfg(feature = "std")]
pub use sync::WakeSignal;

#[cfg(test)]
mod tests;
