// Shared test nodes for the runtime integration tests.
#![allow(dead_code)]

use pipecore::{Emitter, NodeError, Pipe, Sink, Source, Value};
use std::sync::{Arc, Mutex};

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub type Log = Arc<Mutex<Vec<(String, Value)>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn payloads(log: &Log) -> Vec<Value> {
    log.lock().unwrap().iter().map(|(_, v)| v.clone()).collect()
}

pub fn strings(log: &Log) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .map(|(_, v)| v.as_str().unwrap_or_default().to_string())
        .collect()
}

/// Emits the items scheduled for each round, one per `pump` call.
pub struct ScriptedSource {
    rounds: Vec<Vec<Value>>,
    cursor: usize,
    pub pump_calls: Arc<Mutex<usize>>,
}

impl ScriptedSource {
    pub fn new(rounds: Vec<Vec<Value>>) -> Self {
        Self {
            rounds,
            cursor: 0,
            pump_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// One item per round.
    pub fn one_per_round(items: Vec<Value>) -> Self {
        Self::new(items.into_iter().map(|v| vec![v]).collect())
    }
}

impl Source for ScriptedSource {
    fn pump(&mut self, out: &mut Emitter<'_>) -> Result<(), NodeError> {
        *self.pump_calls.lock().unwrap() += 1;
        let round = out.round() as usize;
        let Some(items) = self.rounds.get(round.wrapping_sub(1)) else {
            return Ok(());
        };
        if let Some(item) = items.get(self.cursor) {
            self.cursor += 1;
            out.emit(item.clone())?;
        } else {
            self.cursor = 0;
        }
        Ok(())
    }
}

/// Multiplies numeric payloads by two.
pub struct Doubler;

impl Pipe for Doubler {
    fn on_data_arrival(
        &mut self,
        _port: &str,
        payload: Value,
        out: &mut Emitter<'_>,
    ) -> Result<(), NodeError> {
        let n = payload.as_f64().ok_or_else(|| NodeError::InvalidInputType {
            field: "default".to_string(),
            expected: "number".to_string(),
            actual: payload.kind().to_string(),
        })?;
        out.emit(n * 2.0)
    }
}

/// Forwards its input unchanged and counts calls.
#[derive(Default)]
pub struct Relay {
    pub calls: Arc<Mutex<usize>>,
}

impl Pipe for Relay {
    fn on_data_arrival(
        &mut self,
        _port: &str,
        payload: Value,
        out: &mut Emitter<'_>,
    ) -> Result<(), NodeError> {
        *self.calls.lock().unwrap() += 1;
        out.emit(payload)
    }
}

/// Always fails.
pub struct Broken;

impl Pipe for Broken {
    fn on_data_arrival(
        &mut self,
        _port: &str,
        _payload: Value,
        _out: &mut Emitter<'_>,
    ) -> Result<(), NodeError> {
        Err(NodeError::ExecutionFailed("boom".to_string()))
    }
}

/// Records `(port, payload)` for every arrival.
pub struct Recorder {
    inputs: Vec<String>,
    log: Log,
}

impl Recorder {
    pub fn new(log: &Log) -> Self {
        Self::with_inputs(log, &["default"])
    }

    pub fn with_inputs(log: &Log, inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            log: log.clone(),
        }
    }
}

impl Sink for Recorder {
    fn input_names(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn on_data_arrival(&mut self, port: &str, payload: Value) -> Result<(), NodeError> {
        self.log.lock().unwrap().push((port.to_string(), payload));
        Ok(())
    }
}
