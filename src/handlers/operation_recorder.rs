//! Operation recorder with event broadcast
//!
//! Wraps a [`ChangeRecorder`] and adds commit/rollback lifecycle hooks plus
//! optional per-operation events sent through a [`GraphEventPublisher`].
//! A failed publish is logged and never undoes the recorded state.

use super::{ChangeRecorder, DiffRecorder, GraphChangeError, GraphChangeHandler, GraphChangeResult};
use crate::config::GraphSyncConfig;
use crate::events::{GraphChangeEvent, GraphChangeKind, GraphDiff, GraphEventPublisher};
use crate::value_objects::{ArcId, NodeId, PropertyValue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Records local graph operations and optionally broadcasts them
pub struct OperationRecorder {
    recorder: ChangeRecorder,
    source: Uuid,
    subject: String,
    publisher: Option<Arc<dyn GraphEventPublisher>>,
    events_enabled: AtomicBool,
}

impl OperationRecorder {
    /// Create a recorder. Events stay disabled until [`set_events_enabled`](Self::set_events_enabled).
    pub fn new(subject: impl Into<String>, publisher: Option<Arc<dyn GraphEventPublisher>>) -> Self {
        Self {
            recorder: ChangeRecorder::new(),
            source: Uuid::new_v4(),
            subject: subject.into(),
            publisher,
            events_enabled: AtomicBool::new(false),
        }
    }

    /// Create a recorder that never publishes
    pub fn without_events() -> Self {
        Self::new(crate::events::DEFAULT_EVENT_SUBJECT, None)
    }

    /// Build a recorder from settings, failing fast if events are requested
    /// without a publisher
    pub fn from_config(
        config: &GraphSyncConfig,
        publisher: Option<Arc<dyn GraphEventPublisher>>,
    ) -> GraphChangeResult<Self> {
        let recorder = Self::new(config.event_subject.clone(), publisher);
        recorder.recorder.set_recording(config.recording_enabled);
        recorder.set_events_enabled(config.events_enabled)?;
        Ok(recorder)
    }

    /// Identity stamped on every emitted event
    pub fn source_id(&self) -> Uuid {
        self.source
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn events_enabled(&self) -> bool {
        self.events_enabled.load(Ordering::Acquire)
    }

    pub fn set_events_enabled(&self, enabled: bool) -> GraphChangeResult<()> {
        if enabled && self.publisher.is_none() {
            return Err(GraphChangeError::Configuration(
                "cannot enable graph events without an event publisher".to_string(),
            ));
        }
        self.events_enabled.store(enabled, Ordering::Release);
        Ok(())
    }

    /// Clear the log after a successful commit
    pub fn graph_committed(&self) -> GraphChangeResult<()> {
        let operation_count = self.finish_transaction();
        info!(source = %self.source, operation_count, "Graph changes committed");
        self.emit(GraphChangeKind::Committed { operation_count });
        Ok(())
    }

    /// Clear the log after a rollback
    pub fn graph_rolled_back(&self) -> GraphChangeResult<()> {
        let operation_count = self.finish_transaction();
        info!(source = %self.source, operation_count, "Graph changes rolled back");
        self.emit(GraphChangeKind::RolledBack { operation_count });
        Ok(())
    }

    pub fn apply<H: GraphChangeHandler + ?Sized>(&self, handler: &H) -> GraphChangeResult<()> {
        self.recorder.apply(handler)
    }

    pub fn undo<H: GraphChangeHandler + ?Sized>(&self, handler: &H) -> GraphChangeResult<()> {
        self.recorder.undo(handler)
    }

    fn finish_transaction(&self) -> usize {
        self.recorder
            .take()
            .iter()
            .map(GraphDiff::operation_count)
            .sum()
    }

    fn record(&self, diff: GraphDiff) -> GraphChangeResult<()> {
        if !self.events_enabled() {
            self.recorder.record(diff);
            return Ok(());
        }
        if self.recorder.record(diff.clone()) {
            self.emit(GraphChangeKind::Operation(diff));
        }
        Ok(())
    }

    fn emit(&self, kind: GraphChangeKind) {
        if !self.events_enabled() {
            return;
        }
        let Some(publisher) = &self.publisher else {
            return;
        };
        let event = GraphChangeEvent::new(self.subject.clone(), self.source, kind);
        let event_type = event.event_type();
        if let Err(e) = publisher.publish(event) {
            warn!(source = %self.source, event_type, error = %e, "Failed to publish graph event");
        }
    }
}

impl GraphChangeHandler for OperationRecorder {
    fn node_created(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        self.record(GraphDiff::node_created(node_id.clone()))
    }

    fn node_deleted(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        self.record(GraphDiff::node_deleted(node_id.clone()))
    }

    fn node_id_changed(&self, node_id: &NodeId, new_id: &NodeId) -> GraphChangeResult<()> {
        self.record(GraphDiff::node_id_changed(node_id.clone(), new_id.clone()))
    }

    fn node_property_changed(
        &self,
        node_id: &NodeId,
        property: &str,
        old_value: &PropertyValue,
        new_value: &PropertyValue,
    ) -> GraphChangeResult<()> {
        self.record(GraphDiff::property_changed(
            node_id.clone(),
            property,
            old_value.clone(),
            new_value.clone(),
        ))
    }

    fn arc_created(
        &self,
        node_id: &NodeId,
        target_id: &NodeId,
        arc_id: &ArcId,
    ) -> GraphChangeResult<()> {
        self.record(GraphDiff::arc_created(
            node_id.clone(),
            target_id.clone(),
            arc_id.clone(),
        ))
    }

    fn arc_deleted(
        &self,
        node_id: &NodeId,
        target_id: &NodeId,
        arc_id: &ArcId,
    ) -> GraphChangeResult<()> {
        self.record(GraphDiff::arc_deleted(
            node_id.clone(),
            target_id.clone(),
            arc_id.clone(),
        ))
    }
}

impl DiffRecorder for OperationRecorder {
    fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    fn set_recording(&self, recording: bool) {
        self.recorder.set_recording(recording)
    }

    fn diffs(&self) -> GraphDiff {
        self.recorder.diffs()
    }

    fn clear(&self) {
        self.recorder.clear()
    }

    fn size(&self) -> usize {
        self.recorder.size()
    }

    fn is_empty(&self) -> bool {
        self.recorder.is_empty()
    }
}
