use crate::{Value, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declarative pipeline definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl PipelineSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_node(&mut self, node: NodeSpec) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn connect(
        &mut self,
        from_node: impl Into<String>,
        from_port: impl Into<String>,
        to_node: impl Into<String>,
        to_port: impl Into<String>,
    ) -> &mut Self {
        self.connections.push(Connection {
            from_node: from_node.into(),
            from_port: from_port.into(),
            to_node: to_node.into(),
            to_port: to_port.into(),
        });
        self
    }

    /// Connect the canonical ports of two nodes.
    pub fn connect_default(
        &mut self,
        from_node: impl Into<String>,
        to_node: impl Into<String>,
    ) -> &mut Self {
        self.connect(from_node, DEFAULT_PORT, to_node, DEFAULT_PORT)
    }

    pub fn find_node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Node instance in a pipeline definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub node_type: String,
    #[serde(default)]
    pub config: HashMap<String, Value>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            config: HashMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

/// Link from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from_node: String,
    #[serde(default = "default_port")]
    pub from_port: String,
    pub to_node: String,
    #[serde(default = "default_port")]
    pub to_port: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_default_when_omitted() {
        let spec: PipelineSpec = serde_json::from_str(
            r#"{
                "name": "deposits",
                "nodes": [
                    {"name": "g", "node_type": "time.interval"},
                    {"name": "p", "node_type": "debug.log"}
                ],
                "connections": [{"from_node": "g", "to_node": "p"}]
            }"#,
        )
        .unwrap();

        assert_eq!(spec.nodes.len(), 2);
        assert!(spec.find_node("g").unwrap().config.is_empty());
        assert_eq!(
            spec.connections[0],
            Connection {
                from_node: "g".to_string(),
                from_port: DEFAULT_PORT.to_string(),
                to_node: "p".to_string(),
                to_port: DEFAULT_PORT.to_string(),
            }
        );
    }

    #[test]
    fn test_builder() {
        let mut spec = PipelineSpec::new("split");
        spec.add_node(NodeSpec::new("s", "flow.splitter").with_config("x", 1))
            .connect("s", "X", "sink", "default");
        assert_eq!(spec.connections[0].from_port, "X");
        assert_eq!(spec.nodes[0].config.get("x"), Some(&Value::from(1)));
    }
}
