use crate::registry::NodeRegistry;
use crate::topology::{self, TopologyReport};
use crate::PipelineConfig;
use chrono::Utc;
use pipecore::{
    EventBus, FlowError, GraphError, NodeError, NodeId, PipelineEvent, PipelineId, PipelineSpec,
    Pipe, PortDirection, PortGraph, PortId, Sink, Source, Stage, Value, DEFAULT_PORT,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Outcome of one scheduling round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStats {
    pub round: u64,
    /// Productive `pump` calls across all sources.
    pub pumped: usize,
    /// Items handed to nodes during the delivery phase.
    pub delivered: usize,
    pub duration: Duration,
}

/// Totals over a run of several rounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rounds: u64,
    pub pumped: usize,
    pub delivered: usize,
}

impl RunSummary {
    fn add(&mut self, stats: &RoundStats) {
        self.rounds += 1;
        self.pumped += stats.pumped;
        self.delivered += stats.delivered;
    }
}

/// Node registry plus the cooperative scheduler that drives it.
///
/// Every round first drains each source to quiescence, in registration
/// order, then delivers buffered items strictly by global sequence number
/// until no port holds anything. Items emitted while delivering join the
/// same ordering, so the whole graph observes events in emission order.
pub struct Pipeline {
    id: PipelineId,
    config: PipelineConfig,
    graph: PortGraph,
    stages: Vec<Stage>,
    names: HashMap<String, NodeId>,
    sources: Vec<NodeId>,
    registry: Arc<NodeRegistry>,
    events: EventBus,
    round: u64,
}

impl Pipeline {
    /// Create an empty pipeline with default settings
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), config)
    }

    /// Create a pipeline whose `create_pipe` resolves types through `registry`
    pub fn with_registry(registry: Arc<NodeRegistry>, config: PipelineConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        Self {
            id: Uuid::new_v4(),
            config,
            graph: PortGraph::new(),
            stages: Vec::new(),
            names: HashMap::new(),
            sources: Vec::new(),
            registry,
            events,
            round: 0,
        }
    }

    /// Build a pipeline from a declarative definition
    pub fn from_spec(
        spec: &PipelineSpec,
        registry: Arc<NodeRegistry>,
        config: PipelineConfig,
    ) -> Result<Self, FlowError> {
        let mut pipeline = Self::with_registry(registry, config);
        for node in &spec.nodes {
            pipeline.create_pipe(&node.name, &node.node_type, &node.config)?;
        }
        for conn in &spec.connections {
            pipeline.connect(&conn.from_node, &conn.from_port, &conn.to_node, &conn.to_port)?;
        }

        let report = pipeline.topology();
        if report.cyclic {
            tracing::warn!("Pipeline '{}' contains a feedback loop", spec.name);
        }
        for port in &report.dangling_outputs {
            tracing::warn!("Output {}.{} is not connected", port.node, port.port);
        }
        tracing::info!(
            "Built pipeline '{}' with {} nodes and {} connections",
            spec.name,
            spec.nodes.len(),
            spec.connections.len()
        );
        Ok(pipeline)
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read-only view of ports and buffers
    pub fn graph(&self) -> &PortGraph {
        &self.graph
    }

    /// Rounds started so far
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Subscribe to execution events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Register a named node. Names are unique within the pipeline.
    pub fn register(&mut self, name: impl Into<String>, stage: Stage) -> Result<NodeId, GraphError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }

        let kind = stage.kind();
        let id = self
            .graph
            .add_node(name.clone(), kind, &stage.input_names(), &stage.output_names())?;
        if matches!(stage, Stage::Source(_)) {
            self.sources.push(id);
        }
        self.stages.push(stage);
        tracing::info!("Registered {} '{}'", kind, name);
        self.names.insert(name, id);
        Ok(id)
    }

    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        source: impl Source + 'static,
    ) -> Result<&mut Self, GraphError> {
        self.register(name, Stage::source(source))?;
        Ok(self)
    }

    pub fn add_pipe(
        &mut self,
        name: impl Into<String>,
        pipe: impl Pipe + 'static,
    ) -> Result<&mut Self, GraphError> {
        self.register(name, Stage::pipe(pipe))?;
        Ok(self)
    }

    pub fn add_sink(
        &mut self,
        name: impl Into<String>,
        sink: impl Sink + 'static,
    ) -> Result<&mut Self, GraphError> {
        self.register(name, Stage::sink(sink))?;
        Ok(self)
    }

    /// Instantiate a registered node type under `name`
    pub fn create_pipe(
        &mut self,
        name: &str,
        node_type: &str,
        config: &HashMap<String, Value>,
    ) -> Result<&mut Self, FlowError> {
        let stage = self
            .registry
            .factory(node_type)?
            .create(config)
            .map_err(|e| FlowError::node(name, e))?;
        self.register(name, stage)?;
        Ok(self)
    }

    pub fn node_id(&self, name: &str) -> Result<NodeId, GraphError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))
    }

    pub fn input_port(&self, node: &str, port: &str) -> Result<PortId, GraphError> {
        self.graph.input_port(self.node_id(node)?, port)
    }

    pub fn output_port(&self, node: &str, port: &str) -> Result<PortId, GraphError> {
        self.graph.output_port(self.node_id(node)?, port)
    }

    pub fn input_port_names(&self, node: &str) -> Result<Vec<String>, GraphError> {
        self.port_names(node, PortDirection::Input)
    }

    pub fn output_port_names(&self, node: &str) -> Result<Vec<String>, GraphError> {
        self.port_names(node, PortDirection::Output)
    }

    fn port_names(&self, node: &str, direction: PortDirection) -> Result<Vec<String>, GraphError> {
        let id = self.node_id(node)?;
        Ok(self
            .graph
            .port_names(id, direction)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Link `src.src_port` (output) to `dst.dst_port` (input)
    pub fn connect(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> Result<&mut Self, GraphError> {
        let from = self.output_port(src, src_port)?;
        let to = self.input_port(dst, dst_port)?;
        self.graph.connect(from, to)?;
        tracing::debug!("Connected {}.{} -> {}.{}", src, src_port, dst, dst_port);
        Ok(self)
    }

    /// Link the canonical ports of two nodes
    pub fn connect_default(&mut self, src: &str, dst: &str) -> Result<&mut Self, GraphError> {
        self.connect(src, DEFAULT_PORT, dst, DEFAULT_PORT)
    }

    pub fn topology(&self) -> TopologyReport {
        topology::analyze(&self.graph)
    }

    /// Source-drain phase: pump every source until it stops emitting.
    ///
    /// Returns the number of pump calls that emitted. A source that keeps
    /// emitting on every call never lets this return.
    pub fn pump_sources(&mut self) -> Result<usize, FlowError> {
        let mut pumped = 0;
        for i in 0..self.sources.len() {
            let id = self.sources[i];
            loop {
                match self.stages[id.index()].pump_wrapper(&mut self.graph, id, self.round) {
                    Ok(true) => pumped += 1,
                    Ok(false) => break,
                    Err(e) => return Err(self.fail(id, e)),
                }
            }
        }
        Ok(pumped)
    }

    /// Delivery phase: hand out buffered items in global sequence order
    /// until every port is empty. Returns the number of items delivered.
    pub fn deliver_pending(&mut self) -> Result<usize, FlowError> {
        let mut delivered = 0;
        while let Some(delivery) = self.graph.next_delivery() {
            let node = delivery.node;
            tracing::trace!(
                sequence = delivery.sequence.0,
                node = self.graph.node(node).name(),
                port = %delivery.port_name,
                "Delivering item"
            );
            let event = self.events.has_subscribers().then(|| PipelineEvent::ItemDelivered {
                pipeline_id: self.id,
                sequence: delivery.sequence,
                node: self.graph.node(node).name().to_string(),
                port: delivery.port_name.clone(),
                timestamp: Utc::now(),
            });

            if let Err(e) = self.stages[node.index()].deliver(&mut self.graph, delivery, self.round) {
                return Err(self.fail(node, e));
            }
            if let Some(event) = event {
                self.events.emit(event);
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    /// One full round: drain sources, deliver everything, then call `on_idle`.
    pub fn run_round<F>(&mut self, mut on_idle: F) -> Result<RoundStats, FlowError>
    where
        F: FnMut(&RoundStats),
    {
        let stats = self.round_inner()?;
        on_idle(&stats);
        Ok(stats)
    }

    fn round_inner(&mut self) -> Result<RoundStats, FlowError> {
        self.round += 1;
        let start = Instant::now();
        self.events.emit(PipelineEvent::RoundStarted {
            pipeline_id: self.id,
            round: self.round,
            timestamp: Utc::now(),
        });

        let pumped = self.pump_sources()?;
        let delivered = self.deliver_pending()?;
        let stats = RoundStats {
            round: self.round,
            pumped,
            delivered,
            duration: start.elapsed(),
        };

        tracing::debug!(
            "Round {} finished: {} pumps, {} deliveries in {:?}",
            stats.round,
            stats.pumped,
            stats.delivered,
            stats.duration
        );
        self.events.emit(PipelineEvent::RoundCompleted {
            pipeline_id: self.id,
            round: stats.round,
            pumped,
            delivered,
            duration_ms: stats.duration.as_millis() as u64,
            timestamp: Utc::now(),
        });
        Ok(stats)
    }

    /// Run exactly `rounds` rounds
    pub fn run_rounds<F>(&mut self, rounds: u64, mut on_idle: F) -> Result<RunSummary, FlowError>
    where
        F: FnMut(&RoundStats),
    {
        let span = tracing::info_span!("pipeline", id = %self.id);
        let _enter = span.enter();

        let mut summary = RunSummary::default();
        for _ in 0..rounds {
            let stats = self.run_round(&mut on_idle)?;
            summary.add(&stats);
        }
        Ok(summary)
    }

    /// Run rounds until `cancel` fires. Cancellation is checked between rounds.
    pub fn run<F>(&mut self, cancel: &CancellationToken, mut on_idle: F) -> Result<RunSummary, FlowError>
    where
        F: FnMut(&RoundStats),
    {
        let span = tracing::info_span!("pipeline", id = %self.id);
        let _enter = span.enter();
        tracing::info!("Starting pipeline with {} nodes", self.stages.len());

        let mut summary = RunSummary::default();
        while !cancel.is_cancelled() {
            let stats = self.run_round(&mut on_idle)?;
            summary.add(&stats);
        }

        tracing::info!("Pipeline stopped after {} rounds", summary.rounds);
        Ok(summary)
    }

    /// Like [`run`](Self::run), sleeping for the configured idle interval
    /// between rounds. Cancellation also interrupts the sleep.
    pub async fn run_paced(&mut self, cancel: &CancellationToken) -> Result<RunSummary, FlowError> {
        let span = tracing::info_span!("pipeline", id = %self.id);
        let interval = self.config.idle_interval();

        async move {
            tracing::info!(
                "Starting paced pipeline with {} nodes, idle interval {:?}",
                self.stages.len(),
                interval
            );
            let mut summary = RunSummary::default();
            while !cancel.is_cancelled() {
                let stats = self.round_inner()?;
                summary.add(&stats);

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            tracing::info!("Pipeline stopped after {} rounds", summary.rounds);
            Ok::<_, FlowError>(summary)
        }
        .instrument(span)
        .await
    }

    fn fail(&self, node: NodeId, error: NodeError) -> FlowError {
        let name = self.graph.node(node).name().to_string();
        tracing::error!("Node '{}' failed: {}", name, error);
        self.events.emit(PipelineEvent::NodeFailed {
            pipeline_id: self.id,
            node: name.clone(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
        FlowError::node(name, error)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
