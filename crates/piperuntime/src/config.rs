use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of the event broadcast channel.
    pub event_buffer_size: usize,
    /// Sleep between rounds in [`Pipeline::run_paced`](crate::Pipeline::run_paced).
    pub idle_interval_ms: u64,
}

impl PipelineConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }

    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval_ms = interval.as_millis() as u64;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            idle_interval_ms: 500,
        }
    }
}
