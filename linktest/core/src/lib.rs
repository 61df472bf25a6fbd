#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

//! # Linktest Core
//!
//! Value types shared by every part of a round/slot scheduled link test:
//! the tick time base, the immutable [`TestPlan`], the schedule arithmetic
//! that turns a single anchor tick into every later deadline, the on-air
//! [`Message`] layout and the structured [`LogEvent`] records a node emits.
//!
//! Nothing in this crate blocks or touches hardware, so all of it can be
//! exercised on the host.

pub mod error;
pub mod events;
pub mod message;
pub mod node;
pub mod plan;
pub mod round;
pub mod schedule;
pub mod time;

#[cfg(feature = "serde")]
pub mod config;

pub use error::PlanError;
pub use events::{
    FloodConfigRecord, FloodDoneRecord, LogEvent, OverrunRecord, RadioConfigRecord,
    RadioWarningKind, RadioWarningRecord, RoundMarker, RxDoneRecord, TestConfigRecord,
};
pub use message::{sanitize, sanitized_key, Message, MessageError, MAX_PAYLOAD_LEN};
pub use node::{NodeId, NodeRoster, MAX_NODES};
pub use plan::{
    FloodConfig, InitiatorPolicy, Key, Mode, ModeConfig, Modem, RadioConfig, TestPlan,
    TestPlanBuilder, WarmupPolicy, DEFAULT_CLOCK_DRIFT, MAX_KEY_LEN,
};
pub use round::{role_for, RoundState, SlotEvent, SlotRole};
pub use schedule::ScheduleTiming;
pub use time::{Tick, TickCounter, TickDuration, TICK_RATE_HZ};

#[cfg(feature = "serde")]
pub use config::PlanFile;

/// Crate version, reported by the host tools.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
