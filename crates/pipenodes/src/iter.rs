use pipecore::{Emitter, NodeError, NodeKind, Source, Stage, Value};
use piperuntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::collections::{HashMap, VecDeque};

/// Replays a fixed list of items, one per round.
pub struct IterSource {
    items: VecDeque<Value>,
    last_round: Option<u64>,
}

impl IterSource {
    pub fn new(items: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            last_round: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl Source for IterSource {
    fn pump(&mut self, out: &mut Emitter<'_>) -> Result<(), NodeError> {
        if self.last_round == Some(out.round()) {
            return Ok(());
        }
        if let Some(item) = self.items.pop_front() {
            self.last_round = Some(out.round());
            out.emit(item)?;
        }
        Ok(())
    }
}

pub struct IterSourceFactory;

impl NodeFactory for IterSourceFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Stage, NodeError> {
        let items = match config.get("items") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Json(serde_json::Value::Array(items))) => {
                items.iter().cloned().map(Value::from).collect()
            }
            _ => {
                return Err(NodeError::Configuration(
                    "'items' must be a list".to_string(),
                ))
            }
        };
        Ok(Stage::source(IterSource::new(items)))
    }

    fn node_type(&self) -> &str {
        "source.iter"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Emit the configured 'items', one per round".to_string(),
            category: "source".to_string(),
            kind: NodeKind::Source,
            inputs: vec![],
            outputs: vec![PortDefinition::new("default", "Next item")],
        }
    }
}
