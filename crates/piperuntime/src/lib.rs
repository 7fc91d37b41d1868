//! Pipeline runtime
//!
//! This crate provides the scheduler that owns a graph of named nodes and
//! delivers their items in global emission order, together with the node
//! type registry and the loaders for declarative pipeline definitions.

mod config;
mod loader;
mod pipeline;
mod registry;
mod topology;

pub use config::PipelineConfig;
pub use loader::{load_config, load_spec};
pub use pipeline::{Pipeline, RoundStats, RunSummary};
pub use registry::{NodeFactory, NodeMetadata, NodeRegistry, PortDefinition};
pub use topology::{analyze, dependency_graph, PortRef, TopologyReport};

pub use tokio_util::sync::CancellationToken;
