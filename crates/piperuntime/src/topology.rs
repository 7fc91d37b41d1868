use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use pipecore::{NodeKind, PortDirection, PortGraph};

/// Unconnected port, by owning node and port name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRef {
    pub node: String,
    pub port: String,
}

/// Static shape of a wired pipeline
#[derive(Debug, Clone)]
pub struct TopologyReport {
    /// Feedback loops are legal but can keep a round from ever draining.
    pub cyclic: bool,
    /// Node names in dependency order, when the graph is acyclic.
    pub order: Option<Vec<String>>,
    /// Outputs with no links; anything emitted there is dropped.
    pub dangling_outputs: Vec<PortRef>,
    /// Inputs nothing feeds.
    pub unfed_inputs: Vec<PortRef>,
    pub sources: usize,
    pub sinks: usize,
}

impl TopologyReport {
    pub fn is_fully_connected(&self) -> bool {
        self.dangling_outputs.is_empty() && self.unfed_inputs.is_empty()
    }
}

/// Build the node-level dependency graph. Node indices follow registration order.
pub fn dependency_graph(graph: &PortGraph) -> DiGraph<String, (String, String)> {
    let mut deps = DiGraph::new();
    for (_, node) in graph.nodes() {
        deps.add_node(node.name().to_string());
    }

    for (id, node) in graph.nodes() {
        for out in node.outputs() {
            let port = graph.port(*out);
            for target in port.connections() {
                let dest = graph.port(target);
                deps.add_edge(
                    NodeIndex::new(id.index()),
                    NodeIndex::new(dest.owner().index()),
                    (port.name().to_string(), dest.name().to_string()),
                );
            }
        }
    }
    deps
}

pub fn analyze(graph: &PortGraph) -> TopologyReport {
    let deps = dependency_graph(graph);
    let cyclic = is_cyclic_directed(&deps);
    let order = toposort(&deps, None)
        .ok()
        .map(|indices| indices.into_iter().map(|idx| deps[idx].clone()).collect());

    let mut dangling_outputs = Vec::new();
    let mut unfed_inputs = Vec::new();
    let mut sources = 0;
    let mut sinks = 0;

    for (id, node) in graph.nodes() {
        match node.kind() {
            NodeKind::Source => sources += 1,
            NodeKind::Sink => sinks += 1,
            NodeKind::Pipe => {}
        }
        for direction in [PortDirection::Input, PortDirection::Output] {
            let ports = match direction {
                PortDirection::Input => node.inputs(),
                PortDirection::Output => node.outputs(),
            };
            for port_id in ports {
                let port = graph.port(*port_id);
                if port.connections().next().is_some() {
                    continue;
                }
                let unconnected = PortRef {
                    node: graph.node(id).name().to_string(),
                    port: port.name().to_string(),
                };
                match direction {
                    PortDirection::Input => unfed_inputs.push(unconnected),
                    PortDirection::Output => dangling_outputs.push(unconnected),
                }
            }
        }
    }

    TopologyReport {
        cyclic,
        order,
        dangling_outputs,
        unfed_inputs,
        sources,
        sinks,
    }
}
