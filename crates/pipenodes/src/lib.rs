//! Standard node library
//!
//! Collection of built-in nodes for common operations

mod aggregate;
mod collect;
mod debug;
mod iter;
mod splitter;
mod time;
mod transform;

pub use aggregate::{WindowSum, WindowSumFactory};
pub use collect::{CollectSink, Collected};
pub use debug::{DebugSink, DebugSinkFactory};
pub use iter::{IterSource, IterSourceFactory};
pub use splitter::{Splitter, SplitterFactory};
pub use time::{IntervalSource, IntervalSourceFactory};
pub use transform::{MapNode, ScaleNode, ScaleNodeFactory};
use piperuntime::NodeRegistry;

use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(aggregate::WindowSumFactory));
    registry.register(Arc::new(debug::DebugSinkFactory));
    registry.register(Arc::new(iter::IterSourceFactory));
    registry.register(Arc::new(splitter::SplitterFactory));
    registry.register(Arc::new(time::IntervalSourceFactory));
    registry.register(Arc::new(transform::ScaleNodeFactory));
}
