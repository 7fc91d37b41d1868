use pipecore::{Emitter, GraphError, NodeError, NodeKind, Pipe, Stage, Value, DEFAULT_PORT};
use piperuntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::collections::HashMap;

/// Copies each input, unmodified, to a fixed list of outputs.
///
/// With routing `{"A": ["X", "Y"], "B": ["T"]}` data arriving on `A` is
/// emitted on `X` then `Y`, data on `B` on `T`. Every copy gets its own
/// sequence number.
#[derive(Debug, Clone)]
pub struct Splitter {
    inputs: Vec<String>,
    outputs: Vec<String>,
    routing: HashMap<String, Vec<String>>,
}

impl Splitter {
    /// Validates every routing key against `inputs` and every target against `outputs`.
    pub fn new(
        inputs: Vec<String>,
        outputs: Vec<String>,
        routing: HashMap<String, Vec<String>>,
    ) -> Result<Self, GraphError> {
        for (input, targets) in &routing {
            if !inputs.contains(input) {
                return Err(GraphError::InvalidRouting(format!(
                    "{} is not a valid input port",
                    input
                )));
            }
            if let Some(bad) = targets.iter().find(|t| !outputs.contains(t)) {
                return Err(GraphError::InvalidRouting(format!(
                    "{} is not a valid output port",
                    bad
                )));
            }
        }
        Ok(Self {
            inputs,
            outputs,
            routing,
        })
    }

    /// Single default input copied to every listed output.
    pub fn fan_out(outputs: &[&str]) -> Result<Self, GraphError> {
        let outputs: Vec<String> = outputs.iter().map(|s| s.to_string()).collect();
        let mut routing = HashMap::new();
        routing.insert(DEFAULT_PORT.to_string(), outputs.clone());
        Self::new(vec![DEFAULT_PORT.to_string()], outputs, routing)
    }

    pub fn route(&self, input: &str) -> Option<&[String]> {
        self.routing.get(input).map(Vec::as_slice)
    }
}

impl Pipe for Splitter {
    fn input_names(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn output_names(&self) -> Vec<String> {
        self.outputs.clone()
    }

    fn on_data_arrival(
        &mut self,
        port: &str,
        payload: Value,
        out: &mut Emitter<'_>,
    ) -> Result<(), NodeError> {
        let targets = self
            .routing
            .get(port)
            .ok_or_else(|| NodeError::MissingRoute(port.to_string()))?;
        for target in targets {
            out.emit_to(target, payload.clone())?;
        }
        Ok(())
    }
}

/// Read a list of strings from an array or JSON array config value.
pub(crate) fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        Value::Json(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn routing_table(value: &Value) -> Option<HashMap<String, Vec<String>>> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| string_list(v).map(|targets| (k.clone(), targets)))
            .collect(),
        Value::Json(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(k, v)| string_list(&Value::Json(v.clone())).map(|targets| (k.clone(), targets)))
            .collect(),
        _ => None,
    }
}

pub struct SplitterFactory;

impl NodeFactory for SplitterFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Stage, NodeError> {
        let ports = |key: &str| match config.get(key) {
            None => Ok(vec![DEFAULT_PORT.to_string()]),
            Some(v) => string_list(v)
                .ok_or_else(|| NodeError::Configuration(format!("'{}' must be a list of names", key))),
        };
        let inputs = ports("inputs")?;
        let outputs = ports("outputs")?;
        let routing = config
            .get("routing")
            .and_then(routing_table)
            .ok_or_else(|| NodeError::Configuration("'routing' must map inputs to output lists".to_string()))?;

        Ok(Stage::pipe(Splitter::new(inputs, outputs, routing)?))
    }

    fn node_type(&self) -> &str {
        "flow.splitter"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Copy each input to a configured set of outputs".to_string(),
            category: "flow".to_string(),
            kind: NodeKind::Pipe,
            inputs: vec![PortDefinition::new("*", "Ports named in 'inputs'")],
            outputs: vec![PortDefinition::new("*", "Ports named in 'outputs'")],
        }
    }
}
