//! Node identities and the round order.

use core::fmt;

use heapless::Vec;

use crate::error::PlanError;

/// Largest roster a plan can carry.
pub const MAX_NODES: usize = 64;

/// Testbed-wide node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct NodeId(pub u16);

impl NodeId {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl From<u16> for NodeId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for NodeId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.0);
    }
}

/// Ordered, duplicate-free list of participating nodes.
///
/// Round `r` belongs to the node at position `r`; the roster length is the
/// number of rounds in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRoster {
    nodes: Vec<NodeId, MAX_NODES>,
}

impl NodeRoster {
    pub fn new<I>(ids: I) -> Result<Self, PlanError>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let mut nodes: Vec<NodeId, MAX_NODES> = Vec::new();
        for id in ids {
            let id = id.into();
            if nodes.contains(&id) {
                return Err(PlanError::DuplicateNode(id));
            }
            nodes.push(id).map_err(|_| PlanError::RosterTooLarge)?;
        }
        if nodes.is_empty() {
            return Err(PlanError::EmptyRoster);
        }
        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    /// Node that owns round `round`, if the round exists.
    pub fn node_for_round(&self, round: usize) -> Option<NodeId> {
        self.nodes.get(round).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.nodes.iter().position(|candidate| *candidate == node)
    }
}
