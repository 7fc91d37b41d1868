use crate::{NodeId, PortId, Sequence, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// Canonical port name used by single-port nodes.
pub const DEFAULT_PORT: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn opposite(self) -> Self {
        match self {
            PortDirection::Input => PortDirection::Output,
            PortDirection::Output => PortDirection::Input,
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// A named, directional endpoint owned by exactly one node.
///
/// Output ports never hold items; emission appends straight into the
/// buffers of the connected input ports.
#[derive(Debug)]
pub struct Port {
    direction: PortDirection,
    name: String,
    owner: NodeId,
    pub(crate) connections: BTreeSet<PortId>,
    pub(crate) buffer: VecDeque<(Sequence, Value)>,
}

impl Port {
    pub(crate) fn new(direction: PortDirection, name: impl Into<String>, owner: NodeId) -> Self {
        Self {
            direction,
            name: name.into(),
            owner,
            connections: BTreeSet::new(),
            buffer: VecDeque::new(),
        }
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn connections(&self) -> impl Iterator<Item = PortId> + '_ {
        self.connections.iter().copied()
    }

    pub fn is_connected_to(&self, other: PortId) -> bool {
        self.connections.contains(&other)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Sequence of the oldest buffered item.
    pub fn front_sequence(&self) -> Option<Sequence> {
        self.buffer.front().map(|(seq, _)| *seq)
    }
}
