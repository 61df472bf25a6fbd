//! Hardware Abstraction Layer (HAL) for link-test nodes
//!
//! This crate provides the vendor-agnostic capabilities the scheduling engine
//! consumes: a radio transceiver, a multi-hop flood engine, a drift-free time
//! authority, the synchronization input and instrumentation pins, and the
//! wake signal used to hand radio interrupts to a processing context.
//! Drivers implement these traits; the engine never touches registers.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod clock;
pub mod error;
pub mod flood;
pub mod gpio;
pub mod interrupt;
pub mod radio;

// Re-export commonly used types
pub use clock::TimeAuthority;
pub use error::{HalError, HalResult};
pub use flood::{Flood, FloodRole, FloodStats};
pub use gpio::{Level, NoPin, SignalPin, SyncInput};
pub use interrupt::IrqNotifier;
pub use radio::{AirtimeParams, IrqMask, Radio, RadioEvents, RxArm, RxConfig, TxConfig};
