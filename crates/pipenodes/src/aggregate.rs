use chrono::{DateTime, Utc};
use pipecore::{Emitter, NodeError, NodeKind, Pipe, Stage, Value};
use piperuntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

/// Rolling sum of one numeric field over a trailing time window
///
/// Each arrival must be an object with a numeric `field` and may carry an
/// RFC 3339 `time`; without one the arrival time is used. After every
/// arrival the node emits `{time, <field>: sum}` over the entries that are
/// at most `window` old.
pub struct WindowSum {
    field: String,
    window: Duration,
    entries: VecDeque<(DateTime<Utc>, f64)>,
    clock: Clock,
}

impl WindowSum {
    pub fn new(field: impl Into<String>, window: Duration) -> Self {
        Self::with_clock(field, window, Utc::now)
    }

    pub fn with_clock(
        field: impl Into<String>,
        window: Duration,
        clock: impl Fn() -> DateTime<Utc> + Send + 'static,
    ) -> Self {
        Self {
            field: field.into(),
            window,
            entries: VecDeque::new(),
            clock: Box::new(clock),
        }
    }

    /// Entries currently inside the window.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Pipe for WindowSum {
    fn on_data_arrival(
        &mut self,
        _port: &str,
        payload: Value,
        out: &mut Emitter<'_>,
    ) -> Result<(), NodeError> {
        let amount = payload
            .get(&self.field)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| NodeError::InvalidInputType {
                field: self.field.clone(),
                expected: "number".to_string(),
                actual: payload
                    .get(&self.field)
                    .map_or("missing", |v| v.kind())
                    .to_string(),
            })?;

        let now = (self.clock)();
        let time = payload
            .get("time")
            .and_then(|v| v.as_str().map(str::to_string))
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(now);
        self.entries.push_back((time, amount));

        let window = self.window;
        self.entries.retain(|(t, _)| {
            (now - *t)
                .to_std()
                .map(|age| age <= window)
                .unwrap_or(true)
        });
        let sum: f64 = self.entries.iter().map(|(_, v)| v).sum();

        let mut result = HashMap::new();
        result.insert("time".to_string(), Value::from(now.to_rfc3339()));
        result.insert(self.field.clone(), Value::from(sum));
        out.emit(result)
    }
}

pub struct WindowSumFactory;

impl NodeFactory for WindowSumFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Stage, NodeError> {
        let field = config
            .get("field")
            .and_then(|v| v.as_str())
            .unwrap_or("amount");
        let window_ms = config
            .get("window_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(60_000.0);
        if window_ms < 0.0 {
            return Err(NodeError::Configuration(
                "'window_ms' must not be negative".to_string(),
            ));
        }
        Ok(Stage::pipe(WindowSum::new(
            field,
            Duration::from_millis(window_ms as u64),
        )))
    }

    fn node_type(&self) -> &str {
        "aggregate.window_sum"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Sum 'field' over the last 'window_ms' milliseconds".to_string(),
            category: "aggregate".to_string(),
            kind: NodeKind::Pipe,
            inputs: vec![PortDefinition::new("default", "{time, <field>}")],
            outputs: vec![PortDefinition::new("default", "{time, <field>: sum}")],
        }
    }
}
