use crate::graph::{Delivery, NodeKind, PortGraph};
use crate::{GraphError, NodeError, NodeId, Value, DEFAULT_PORT};

fn default_ports() -> Vec<String> {
    vec![DEFAULT_PORT.to_string()]
}

/// A processing node with input and output ports.
pub trait Pipe: Send {
    /// Input port names, unique, in declaration order.
    fn input_names(&self) -> Vec<String> {
        default_ports()
    }

    /// Output port names, unique, in declaration order.
    fn output_names(&self) -> Vec<String> {
        default_ports()
    }

    /// Called once per delivered item with the receiving input port's name.
    fn on_data_arrival(
        &mut self,
        port: &str,
        payload: Value,
        out: &mut Emitter<'_>,
    ) -> Result<(), NodeError>;
}

/// A node without inputs that produces data on its own.
pub trait Source: Send {
    fn output_names(&self) -> Vec<String> {
        default_ports()
    }

    /// Inspect external state and optionally emit.
    ///
    /// Called repeatedly within a round until a call emits nothing.
    fn pump(&mut self, out: &mut Emitter<'_>) -> Result<(), NodeError>;
}

/// A terminal node without outputs.
pub trait Sink: Send {
    fn input_names(&self) -> Vec<String> {
        default_ports()
    }

    fn on_data_arrival(&mut self, port: &str, payload: Value) -> Result<(), NodeError>;
}

/// Emission handle handed to a node for the duration of one call.
///
/// Each emit allocates fresh sequence numbers from the owning graph, so
/// items produced during delivery are ordered after everything already
/// buffered.
pub struct Emitter<'a> {
    graph: &'a mut PortGraph,
    node: NodeId,
    round: u64,
    emitted: usize,
}

impl<'a> Emitter<'a> {
    pub fn new(graph: &'a mut PortGraph, node: NodeId, round: u64) -> Self {
        Self {
            graph,
            node,
            round,
            emitted: 0,
        }
    }

    /// Emit on the canonical output port.
    pub fn emit(&mut self, payload: impl Into<Value>) -> Result<(), NodeError> {
        self.emit_to(DEFAULT_PORT, payload)
    }

    /// Emit on the named output port.
    pub fn emit_to(&mut self, port: &str, payload: impl Into<Value>) -> Result<(), NodeError> {
        let id = self.graph.output_port(self.node, port)?;
        self.graph.emit(id, payload.into())?;
        self.emitted += 1;
        Ok(())
    }

    /// Emit calls made through this handle so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Current scheduling round, starting at 1.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn node_name(&self) -> &str {
        self.graph.node(self.node).name()
    }
}

/// A registered node, tagged by its structural role.
pub enum Stage {
    Source(Box<dyn Source>),
    Pipe(Box<dyn Pipe>),
    Sink(Box<dyn Sink>),
}

impl Stage {
    pub fn source(source: impl Source + 'static) -> Self {
        Stage::Source(Box::new(source))
    }

    pub fn pipe(pipe: impl Pipe + 'static) -> Self {
        Stage::Pipe(Box::new(pipe))
    }

    pub fn sink(sink: impl Sink + 'static) -> Self {
        Stage::Sink(Box::new(sink))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Stage::Source(_) => NodeKind::Source,
            Stage::Pipe(_) => NodeKind::Pipe,
            Stage::Sink(_) => NodeKind::Sink,
        }
    }

    pub fn input_names(&self) -> Vec<String> {
        match self {
            Stage::Source(_) => Vec::new(),
            Stage::Pipe(p) => p.input_names(),
            Stage::Sink(s) => s.input_names(),
        }
    }

    pub fn output_names(&self) -> Vec<String> {
        match self {
            Stage::Source(s) => s.output_names(),
            Stage::Pipe(p) => p.output_names(),
            Stage::Sink(_) => Vec::new(),
        }
    }

    /// Run one `pump` with a fresh emit counter and report whether it emitted.
    ///
    /// Only sources are pumped; other stages report no emission.
    pub fn pump_wrapper(
        &mut self,
        graph: &mut PortGraph,
        node: NodeId,
        round: u64,
    ) -> Result<bool, NodeError> {
        match self {
            Stage::Source(source) => {
                let mut out = Emitter::new(graph, node, round);
                source.pump(&mut out)?;
                Ok(out.emitted() > 0)
            }
            Stage::Pipe(_) | Stage::Sink(_) => Ok(false),
        }
    }

    /// Hand one delivered item to the node.
    pub fn deliver(
        &mut self,
        graph: &mut PortGraph,
        delivery: Delivery,
        round: u64,
    ) -> Result<(), NodeError> {
        match self {
            Stage::Source(_) => Err(GraphError::NoInputPorts(
                graph.node(delivery.node).name().to_string(),
            )
            .into()),
            Stage::Pipe(pipe) => {
                let mut out = Emitter::new(graph, delivery.node, round);
                pipe.on_data_arrival(&delivery.port_name, delivery.payload, &mut out)
            }
            Stage::Sink(sink) => sink.on_data_arrival(&delivery.port_name, delivery.payload),
        }
    }
}
