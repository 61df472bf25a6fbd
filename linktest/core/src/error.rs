//! Configuration errors raised while building a [`TestPlan`](crate::TestPlan).

use core::fmt;

use crate::node::NodeId;

/// Reasons a test plan is rejected before the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// The node roster is empty
    EmptyRoster,
    /// More nodes than the roster can hold
    RosterTooLarge,
    /// A node id appears more than once in the roster
    DuplicateNode(NodeId),
    /// A round needs at least one slot
    NoSlots,
    /// The payload key exceeds the maximum key length
    KeyTooLong(usize),
    /// The payload key contains a byte that would not survive sanitation
    InvalidKeyByte(u8),
    /// Both P2P and flood parameters were supplied
    ConflictingModes,
    /// Neither P2P nor flood parameters were supplied
    MissingMode,
    /// The fixed flood initiator is not part of the roster
    UnknownInitiator(NodeId),
    /// Derived round timing does not fit the tick range
    TimingOverflow,
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::EmptyRoster => write!(f, "node roster is empty"),
            PlanError::RosterTooLarge => write!(f, "node roster exceeds capacity"),
            PlanError::DuplicateNode(id) => write!(f, "node {id} listed more than once"),
            PlanError::NoSlots => write!(f, "at least one slot per round is required"),
            PlanError::KeyTooLong(len) => write!(f, "payload key too long: {len} bytes"),
            PlanError::InvalidKeyByte(byte) => {
                write!(f, "payload key contains invalid byte 0x{byte:02x}")
            }
            PlanError::ConflictingModes => write!(f, "p2p and flood mode are mutually exclusive"),
            PlanError::MissingMode => write!(f, "either p2p or flood mode must be selected"),
            PlanError::UnknownInitiator(id) => {
                write!(f, "flood initiator {id} is not in the node roster")
            }
            PlanError::TimingOverflow => write!(f, "round timing overflows the tick range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PlanError {}

#[cfg(feature = "defmt")]
impl defmt::Format for PlanError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            PlanError::EmptyRoster => defmt::write!(fmt, "EmptyRoster"),
            PlanError::RosterTooLarge => defmt::write!(fmt, "RosterTooLarge"),
            PlanError::DuplicateNode(id) => defmt::write!(fmt, "DuplicateNode({})", id),
            PlanError::NoSlots => defmt::write!(fmt, "NoSlots"),
            PlanError::KeyTooLong(len) => defmt::write!(fmt, "KeyTooLong({})", len),
            PlanError::InvalidKeyByte(byte) => defmt::write!(fmt, "InvalidKeyByte({})", byte),
            PlanError::ConflictingModes => defmt::write!(fmt, "ConflictingModes"),
            PlanError::MissingMode => defmt::write!(fmt, "MissingMode"),
            PlanError::UnknownInitiator(id) => defmt::write!(fmt, "UnknownInitiator({})", id),
            PlanError::TimingOverflow => defmt::write!(fmt, "TimingOverflow"),
        }
    }
}
