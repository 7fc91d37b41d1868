use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Node '{node}' failed: {source}")]
    Node {
        node: String,
        #[source]
        source: NodeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    pub fn node(node: impl Into<String>, source: NodeError) -> Self {
        FlowError::Node {
            node: node.into(),
            source,
        }
    }
}

/// Configuration faults raised while a graph is being assembled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("Duplicate {direction} port name '{port}' on node '{node}'")]
    DuplicatePort {
        node: String,
        direction: String,
        port: String,
    },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node '{node}' has no {direction} port named '{port}'")]
    PortNotFound {
        node: String,
        direction: String,
        port: String,
    },

    #[error("Cannot connect two {0} ports")]
    SameDirection(String),

    #[error("Source '{0}' has no input ports")]
    NoInputPorts(String),

    #[error("Sink '{0}' has no output ports")]
    NoOutputPorts(String),

    #[error("Can only emit on an output port, '{port}' on '{node}' is an input")]
    EmitOnInput { node: String, port: String },

    #[error("Invalid routing: {0}")]
    InvalidRouting(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
}

/// Faults raised by node code while the pipeline runs.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("No route for input port '{0}'")]
    MissingRoute(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
