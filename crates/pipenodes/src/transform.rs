use pipecore::{Emitter, NodeError, NodeKind, Pipe, Stage, Value};
use piperuntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::collections::HashMap;

type MapFn = Box<dyn FnMut(Value) -> Result<Value, NodeError> + Send>;

/// Applies a closure to every payload and emits the result
pub struct MapNode {
    f: MapFn,
}

impl MapNode {
    pub fn new(f: impl FnMut(Value) -> Result<Value, NodeError> + Send + 'static) -> Self {
        Self { f: Box::new(f) }
    }
}

impl Pipe for MapNode {
    fn on_data_arrival(
        &mut self,
        _port: &str,
        payload: Value,
        out: &mut Emitter<'_>,
    ) -> Result<(), NodeError> {
        let mapped = (self.f)(payload)?;
        out.emit(mapped)
    }
}

/// Multiplies numeric payloads by a constant factor
#[derive(Debug, Clone, Copy)]
pub struct ScaleNode {
    factor: f64,
}

impl ScaleNode {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl Pipe for ScaleNode {
    fn on_data_arrival(
        &mut self,
        port: &str,
        payload: Value,
        out: &mut Emitter<'_>,
    ) -> Result<(), NodeError> {
        let n = payload.as_f64().ok_or_else(|| NodeError::InvalidInputType {
            field: port.to_string(),
            expected: "number".to_string(),
            actual: payload.kind().to_string(),
        })?;
        out.emit(n * self.factor)
    }
}

pub struct ScaleNodeFactory;

impl NodeFactory for ScaleNodeFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Stage, NodeError> {
        let factor = config
            .get("factor")
            .and_then(|v| v.as_f64())
            .unwrap_or(2.0);
        Ok(Stage::pipe(ScaleNode::new(factor)))
    }

    fn node_type(&self) -> &str {
        "transform.scale"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Multiply numbers by 'factor' (default 2)".to_string(),
            category: "transform".to_string(),
            kind: NodeKind::Pipe,
            inputs: vec![PortDefinition::new("default", "Number")],
            outputs: vec![PortDefinition::new("default", "Scaled number")],
        }
    }
}
