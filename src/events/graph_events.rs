//! Graph change events
//!
//! Events broadcast by an [`OperationRecorder`](crate::handlers::OperationRecorder)
//! for each recorded operation and at commit/rollback boundaries.

use crate::events::GraphDiff;
use crate::handlers::{GraphChangeError, GraphChangeResult};
use chrono::{DateTime, Utc};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Default subject for object graph change events
pub const DEFAULT_EVENT_SUBJECT: &str = "graphs.object.change.v1";

/// Capacity for channel publishers created with [`ChannelEventPublisher::bounded_default`]
const CHANNEL_CAPACITY: usize = 1000;

/// What happened to the recorded graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphChangeKind {
    /// A single operation was recorded
    Operation(GraphDiff),
    /// Recorded changes were committed and the log cleared
    Committed {
        /// Number of leaf operations cleared
        operation_count: usize,
    },
    /// Recorded changes were rolled back and the log cleared
    RolledBack {
        /// Number of leaf operations cleared
        operation_count: usize,
    },
}

/// Graph change event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphChangeEvent {
    /// Unique id of this event
    pub event_id: Uuid,
    /// Subject the event is published under
    pub subject: String,
    /// Identity of the recorder that emitted the event
    pub source: Uuid,
    /// Payload
    pub kind: GraphChangeKind,
    /// When the event was created
    pub occurred_at: DateTime<Utc>,
}

impl GraphChangeEvent {
    pub fn new(subject: impl Into<String>, source: Uuid, kind: GraphChangeKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            subject: subject.into(),
            source,
            kind,
            occurred_at: Utc::now(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match &self.kind {
            GraphChangeKind::Operation(diff) => diff.event_type(),
            GraphChangeKind::Committed { .. } => "GraphCommitted",
            GraphChangeKind::RolledBack { .. } => "GraphRolledBack",
        }
    }
}

/// Trait for publishing graph change events
pub trait GraphEventPublisher: Send + Sync {
    /// Publish one event. Must not block.
    fn publish(&self, event: GraphChangeEvent) -> GraphChangeResult<()>;
}

/// A simple logging implementation of GraphEventPublisher
pub struct LoggingEventPublisher;

impl GraphEventPublisher for LoggingEventPublisher {
    fn publish(&self, event: GraphChangeEvent) -> GraphChangeResult<()> {
        info!(
            event_id = %event.event_id,
            subject = %event.subject,
            source = %event.source,
            event_type = event.event_type(),
            "Publishing graph change event"
        );
        Ok(())
    }
}

/// Publisher that hands events to a crossbeam channel, typically drained by a
/// remote-sync worker
pub struct ChannelEventPublisher {
    sender: Sender<GraphChangeEvent>,
}

impl ChannelEventPublisher {
    /// Create a publisher and the receiving end of its channel
    pub fn bounded(capacity: usize) -> (Self, Receiver<GraphChangeEvent>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }

    pub fn bounded_default() -> (Self, Receiver<GraphChangeEvent>) {
        Self::bounded(CHANNEL_CAPACITY)
    }
}

impl GraphEventPublisher for ChannelEventPublisher {
    fn publish(&self, event: GraphChangeEvent) -> GraphChangeResult<()> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => GraphChangeError::Publish("event channel full".to_string()),
            TrySendError::Disconnected(_) => {
                GraphChangeError::Publish("event channel closed".to_string())
            }
        })
    }
}
