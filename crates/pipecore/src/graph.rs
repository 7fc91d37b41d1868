//! Port graph: the arena of nodes and ports, the sequence counter and
//! the ready-set that orders pending deliveries.

use crate::port::Port;
use crate::{GraphError, NodeId, PortDirection, PortId, Sequence, SequenceCounter, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;

/// Structural role of a node, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Source,
    Pipe,
    Sink,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Source => f.write_str("source"),
            NodeKind::Pipe => f.write_str("pipe"),
            NodeKind::Sink => f.write_str("sink"),
        }
    }
}

/// Port table of one node, in declaration order.
#[derive(Debug)]
pub struct NodePorts {
    name: String,
    kind: NodeKind,
    inputs: Vec<PortId>,
    outputs: Vec<PortId>,
}

impl NodePorts {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn inputs(&self) -> &[PortId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PortId] {
        &self.outputs
    }
}

/// One item popped off the ready-set, addressed to its receiving port.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub sequence: Sequence,
    pub node: NodeId,
    pub port: PortId,
    pub port_name: String,
    pub payload: Value,
}

#[derive(Debug, Default)]
pub struct PortGraph {
    nodes: Vec<NodePorts>,
    ports: Vec<Port>,
    sequence: SequenceCounter,
    /// One `(front sequence, port)` entry per non-empty input buffer.
    ready: BinaryHeap<Reverse<(Sequence, PortId)>>,
}

impl PortGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node together with its ports.
    ///
    /// Port names must be unique per direction. Sources are created without
    /// inputs and sinks without outputs regardless of what is passed.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        input_names: &[String],
        output_names: &[String],
    ) -> Result<NodeId, GraphError> {
        let name = name.into();
        let input_names: &[String] = if kind == NodeKind::Source { &[] } else { input_names };
        let output_names: &[String] = if kind == NodeKind::Sink { &[] } else { output_names };

        check_unique(&name, PortDirection::Input, input_names)?;
        check_unique(&name, PortDirection::Output, output_names)?;

        let id = NodeId(self.nodes.len() as u32);
        let inputs = input_names
            .iter()
            .map(|port| self.push_port(PortDirection::Input, port, id))
            .collect();
        let outputs = output_names
            .iter()
            .map(|port| self.push_port(PortDirection::Output, port, id))
            .collect();

        self.nodes.push(NodePorts {
            name,
            kind,
            inputs,
            outputs,
        });
        Ok(id)
    }

    fn push_port(&mut self, direction: PortDirection, name: &str, owner: NodeId) -> PortId {
        let id = PortId(self.ports.len() as u32);
        self.ports.push(Port::new(direction, name, owner));
        id
    }

    /// Panics if `id` was not issued by this graph; see [`get_node`](Self::get_node).
    pub fn node(&self, id: NodeId) -> &NodePorts {
        &self.nodes[id.index()]
    }

    pub fn get_node(&self, id: NodeId) -> Option<&NodePorts> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodePorts)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Panics if `id` was not issued by this graph; see [`get_port`](Self::get_port).
    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.index()]
    }

    pub fn get_port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.index())
    }

    pub fn port_names(&self, node: NodeId, direction: PortDirection) -> Vec<&str> {
        let table = self.node(node);
        let ids = match direction {
            PortDirection::Input => &table.inputs,
            PortDirection::Output => &table.outputs,
        };
        ids.iter().map(|id| self.port(*id).name()).collect()
    }

    /// Resolve an input port by name. Sources have none.
    pub fn input_port(&self, node: NodeId, name: &str) -> Result<PortId, GraphError> {
        let table = self.node(node);
        if table.kind == NodeKind::Source {
            return Err(GraphError::NoInputPorts(table.name.clone()));
        }
        self.lookup(table, &table.inputs, PortDirection::Input, name)
    }

    /// Resolve an output port by name. Sinks have none.
    pub fn output_port(&self, node: NodeId, name: &str) -> Result<PortId, GraphError> {
        let table = self.node(node);
        if table.kind == NodeKind::Sink {
            return Err(GraphError::NoOutputPorts(table.name.clone()));
        }
        self.lookup(table, &table.outputs, PortDirection::Output, name)
    }

    fn lookup(
        &self,
        table: &NodePorts,
        ids: &[PortId],
        direction: PortDirection,
        name: &str,
    ) -> Result<PortId, GraphError> {
        ids.iter()
            .copied()
            .find(|id| self.port(*id).name() == name)
            .ok_or_else(|| GraphError::PortNotFound {
                node: table.name.clone(),
                direction: direction.to_string(),
                port: name.to_string(),
            })
    }

    /// Link two ports of opposite direction. The link is recorded on both sides.
    pub fn connect(&mut self, a: PortId, b: PortId) -> Result<(), GraphError> {
        let direction = self.port(a).direction();
        if direction == self.port(b).direction() {
            return Err(GraphError::SameDirection(direction.to_string()));
        }
        self.ports[a.index()].connections.insert(b);
        self.ports[b.index()].connections.insert(a);
        Ok(())
    }

    /// Fan `payload` out to every port connected to the output port `from`.
    ///
    /// Each copy gets its own sequence number, allocated in ascending order of
    /// the receiving port id. Returns the number of copies queued; an
    /// unconnected output discards the payload.
    pub fn emit(&mut self, from: PortId, payload: Value) -> Result<usize, GraphError> {
        let port = self.port(from);
        if port.direction() != PortDirection::Output {
            return Err(GraphError::EmitOnInput {
                node: self.node(port.owner()).name.clone(),
                port: port.name().to_string(),
            });
        }

        let targets: Vec<PortId> = port.connections().collect();
        if targets.is_empty() {
            tracing::trace!(
                node = %self.node(port.owner()).name,
                port = port.name(),
                "Output port is unconnected, dropping payload"
            );
        }
        for target in &targets {
            let seq = self.sequence.allocate();
            let dest = &mut self.ports[target.index()];
            let was_empty = dest.buffer.is_empty();
            dest.buffer.push_back((seq, payload.clone()));
            if was_empty {
                self.ready.push(Reverse((seq, *target)));
            }
        }
        Ok(targets.len())
    }

    /// Pop the globally oldest buffered item.
    pub fn next_delivery(&mut self) -> Option<Delivery> {
        let Reverse((seq, port_id)) = self.ready.pop()?;
        let port = &mut self.ports[port_id.index()];
        let (buffered, payload) = port.buffer.pop_front()?;
        debug_assert_eq!(buffered, seq, "ready-set entry out of sync with buffer");
        if let Some(next) = port.front_sequence() {
            self.ready.push(Reverse((next, port_id)));
        }
        Some(Delivery {
            sequence: seq,
            node: port.owner(),
            port: port_id,
            port_name: port.name().to_string(),
            payload,
        })
    }

    pub fn has_pending(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Number of ports currently in the ready-set.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Total items buffered across all input ports.
    pub fn pending_items(&self) -> usize {
        self.ports.iter().map(Port::len).sum()
    }

    pub fn sequences_allocated(&self) -> u64 {
        self.sequence.allocated()
    }
}

fn check_unique(node: &str, direction: PortDirection, names: &[String]) -> Result<(), GraphError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(GraphError::DuplicatePort {
                node: node.to_string(),
                direction: direction.to_string(),
                port: name.clone(),
            });
        }
    }
    Ok(())
}
