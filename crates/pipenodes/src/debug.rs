use pipecore::{NodeError, NodeKind, Sink, Stage, Value};
use piperuntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::collections::HashMap;

/// Sink that logs every arrival
pub struct DebugSink {
    label: String,
}

impl DebugSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Sink for DebugSink {
    fn on_data_arrival(&mut self, port: &str, payload: Value) -> Result<(), NodeError> {
        tracing::info!(sink = %self.label, port, "DEBUG: {:?}", payload);
        Ok(())
    }
}

pub struct DebugSinkFactory;

impl NodeFactory for DebugSinkFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Stage, NodeError> {
        let label = config
            .get("label")
            .and_then(|v| v.as_str())
            .unwrap_or("debug");
        Ok(Stage::sink(DebugSink::new(label)))
    }

    fn node_type(&self) -> &str {
        "debug.log"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Logs input values for debugging".to_string(),
            category: "debug".to_string(),
            kind: NodeKind::Sink,
            inputs: vec![PortDefinition::new("default", "Any value")],
            outputs: vec![],
        }
    }
}
