//! Host port of the link-test engine.
//!
//! Runs every node of a test plan on its own thread against a simulated
//! medium. All nodes share one monotonic epoch and are started by a common
//! [`SyncLine`], so their traces can be compared as if they came from a
//! testbed.

pub mod airtime;
pub mod clock;
pub mod error;
pub mod flood;
pub mod medium;
pub mod network;
pub mod pins;
pub mod plan;
pub mod radio;

pub use clock::StdClock;
pub use error::SimError;
pub use flood::{flood_duration_us, SimFlood};
pub use medium::{Ether, Fault, IrqLine, LinkModel, LinkQuality};
pub use network::{NodeOutcome, RelayKind, SimConfig, SimNetwork};
pub use pins::{SimPin, SyncLine, SyncLineInput};
pub use plan::{load_plan, parse_plan};
pub use radio::{RadioMode, SimRadio};
