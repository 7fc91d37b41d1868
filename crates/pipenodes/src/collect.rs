use pipecore::{NodeError, Sink, Value, DEFAULT_PORT};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared view of what a [`CollectSink`] has received.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    items: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Collected {
    fn lock(&self) -> MutexGuard<'_, Vec<(String, Value)>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Payloads in arrival order.
    pub fn values(&self) -> Vec<Value> {
        self.lock().iter().map(|(_, v)| v.clone()).collect()
    }

    /// Payloads that arrived on `port`, in arrival order.
    pub fn on_port(&self, port: &str) -> Vec<Value> {
        self.lock()
            .iter()
            .filter(|(p, _)| p == port)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// `(port, payload)` pairs in arrival order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn take(&self) -> Vec<(String, Value)> {
        std::mem::take(&mut *self.lock())
    }
}

/// Sink that records every arrival for later inspection
pub struct CollectSink {
    inputs: Vec<String>,
    collected: Collected,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::with_inputs(&[DEFAULT_PORT])
    }

    pub fn with_inputs(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            collected: Collected::default(),
        }
    }

    pub fn handle(&self) -> Collected {
        self.collected.clone()
    }
}

impl Default for CollectSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for CollectSink {
    fn input_names(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn on_data_arrival(&mut self, port: &str, payload: Value) -> Result<(), NodeError> {
        self.collected.lock().push((port.to_string(), payload));
        Ok(())
    }
}
