use chrono::{DateTime, Utc};
use pipecore::{Emitter, NodeError, NodeKind, Source, Stage, Value};
use piperuntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::collections::HashMap;
use std::time::Duration;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

/// Emits a `{time, count}` tick once `interval` has passed since the last one
///
/// At most one tick per round, so a short interval cannot keep the
/// source-drain phase spinning.
pub struct IntervalSource {
    interval: Duration,
    last_emit: DateTime<Utc>,
    last_round: Option<u64>,
    count: u64,
    clock: Clock,
}

impl IntervalSource {
    /// The first tick comes one `interval` after construction.
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, Utc::now)
    }

    pub fn with_clock(
        interval: Duration,
        clock: impl Fn() -> DateTime<Utc> + Send + 'static,
    ) -> Self {
        Self {
            interval,
            last_emit: clock(),
            last_round: None,
            count: 0,
            clock: Box::new(clock),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.count
    }
}

impl Source for IntervalSource {
    fn pump(&mut self, out: &mut Emitter<'_>) -> Result<(), NodeError> {
        if self.last_round == Some(out.round()) {
            return Ok(());
        }
        let now = (self.clock)();
        let due = (now - self.last_emit)
            .to_std()
            .map(|elapsed| elapsed >= self.interval)
            .unwrap_or(false);
        if !due {
            return Ok(());
        }

        self.count += 1;
        self.last_emit = now;
        self.last_round = Some(out.round());
        let mut tick = HashMap::new();
        tick.insert("time".to_string(), Value::from(now.to_rfc3339()));
        tick.insert("count".to_string(), Value::from(self.count as i64));
        out.emit(tick)
    }
}

pub struct IntervalSourceFactory;

impl NodeFactory for IntervalSourceFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Stage, NodeError> {
        let interval_ms = config
            .get("interval_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(1000.0);
        if interval_ms <= 0.0 {
            return Err(NodeError::Configuration(
                "'interval_ms' must be positive".to_string(),
            ));
        }
        Ok(Stage::source(IntervalSource::new(Duration::from_millis(
            interval_ms as u64,
        ))))
    }

    fn node_type(&self) -> &str {
        "time.interval"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Emit a tick every 'interval_ms' milliseconds (default 1000)".to_string(),
            category: "time".to_string(),
            kind: NodeKind::Source,
            inputs: vec![],
            outputs: vec![PortDefinition::new("default", "{time, count}")],
        }
    }
}
