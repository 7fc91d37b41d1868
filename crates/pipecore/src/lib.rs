//! Core abstractions for the pipe engine
//!
//! This crate provides the payload type, the port graph with its global
//! sequence counter and ready-set, and the traits nodes implement. The
//! scheduler that drives them lives in `piperuntime`.

mod error;
pub mod events;
mod graph;
mod id;
mod node;
mod port;
mod sequence;
mod spec;
mod value;

pub use error::{FlowError, GraphError, NodeError};
pub use graph::{Delivery, NodeKind, NodePorts, PortGraph};
pub use id::{NodeId, PortId};
pub use node::{Emitter, Pipe, Sink, Source, Stage};
pub use port::{Port, PortDirection, DEFAULT_PORT};
pub use sequence::{Sequence, SequenceCounter};
pub use spec::{Connection, NodeSpec, PipelineSpec};
pub use value::Value;
pub use events::*;

/// Result type for pipe operations
pub type Result<T> = std::result::Result<T, FlowError>;
