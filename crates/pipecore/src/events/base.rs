use crate::Sequence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type PipelineId = Uuid;

/// Events published while a pipeline runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    RoundStarted {
        pipeline_id: PipelineId,
        round: u64,
        timestamp: DateTime<Utc>,
    },
    ItemDelivered {
        pipeline_id: PipelineId,
        sequence: Sequence,
        node: String,
        port: String,
        timestamp: DateTime<Utc>,
    },
    RoundCompleted {
        pipeline_id: PipelineId,
        round: u64,
        pumped: usize,
        delivered: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        pipeline_id: PipelineId,
        node: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn pipeline_id(&self) -> PipelineId {
        match self {
            PipelineEvent::RoundStarted { pipeline_id, .. }
            | PipelineEvent::ItemDelivered { pipeline_id, .. }
            | PipelineEvent::RoundCompleted { pipeline_id, .. }
            | PipelineEvent::NodeFailed { pipeline_id, .. } => *pipeline_id,
        }
    }
}

/// Broadcast bus for pipeline events
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Without subscribers this is a no-op.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
