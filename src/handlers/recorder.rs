//! Change recorder
//!
//! Appends every callback it receives to an ordered log while recording is
//! enabled. The flag and the log share one mutex so a toggle can never race
//! with an in-flight append.

use super::{GraphChangeHandler, GraphChangeResult};
use crate::events::GraphDiff;
use crate::value_objects::{ArcId, NodeId, PropertyValue};
use parking_lot::Mutex;
use tracing::debug;

/// A change handler that accumulates a replayable log.
///
/// [`GraphStateManager`](crate::aggregate::GraphStateManager) uses this to
/// suspend recording while external changes are merged.
pub trait DiffRecorder: GraphChangeHandler {
    fn is_recording(&self) -> bool;

    fn set_recording(&self, recording: bool);

    /// Snapshot of the log as a single compound diff
    fn diffs(&self) -> GraphDiff;

    fn clear(&self);

    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

#[derive(Debug)]
struct RecorderState {
    recording: bool,
    diffs: Vec<GraphDiff>,
}

/// Records graph changes as [`GraphDiff`] operations
#[derive(Debug)]
pub struct ChangeRecorder {
    state: Mutex<RecorderState>,
}

impl Default for ChangeRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeRecorder {
    /// Create a recorder with recording enabled
    pub fn new() -> Self {
        Self::with_recording(true)
    }

    pub fn with_recording(recording: bool) -> Self {
        Self {
            state: Mutex::new(RecorderState {
                recording,
                diffs: Vec::new(),
            }),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().recording
    }

    /// Toggle recording. While disabled, callbacks are dropped, not queued.
    pub fn set_recording(&self, recording: bool) {
        self.state.lock().recording = recording;
    }

    /// Append `diff` if recording; returns whether it was kept
    pub(crate) fn record(&self, diff: GraphDiff) -> bool {
        let mut state = self.state.lock();
        if !state.recording {
            debug!(op = diff.event_type(), "Recording disabled, dropping graph change");
            return false;
        }
        state.diffs.push(diff);
        true
    }

    /// Replay the log onto `handler` in insertion order
    pub fn apply<H: GraphChangeHandler + ?Sized>(&self, handler: &H) -> GraphChangeResult<()> {
        for diff in self.snapshot() {
            diff.apply(handler)?;
        }
        Ok(())
    }

    /// Undo each logged diff onto `handler`.
    ///
    /// Entries are visited in insertion order, not reverse order. Callers that
    /// need a strict inverse should use `diffs().undo(..)` instead.
    pub fn undo<H: GraphChangeHandler + ?Sized>(&self, handler: &H) -> GraphChangeResult<()> {
        for diff in self.snapshot() {
            diff.undo(handler)?;
        }
        Ok(())
    }

    pub fn diffs(&self) -> GraphDiff {
        GraphDiff::compound(self.snapshot())
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        debug!(cleared = state.diffs.len(), "Clearing recorded graph changes");
        state.diffs.clear();
    }

    /// Drain the log under one lock, returning what was recorded
    pub(crate) fn take(&self) -> Vec<GraphDiff> {
        let mut state = self.state.lock();
        debug!(cleared = state.diffs.len(), "Draining recorded graph changes");
        std::mem::take(&mut state.diffs)
    }

    pub fn size(&self) -> usize {
        self.state.lock().diffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().diffs.is_empty()
    }

    // Replay happens outside the lock so a recorder can be replayed into itself.
    fn snapshot(&self) -> Vec<GraphDiff> {
        self.state.lock().diffs.clone()
    }
}

impl GraphChangeHandler for ChangeRecorder {
    fn node_created(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        self.record(GraphDiff::node_created(node_id.clone()));
        Ok(())
    }

    fn node_deleted(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        self.record(GraphDiff::node_deleted(node_id.clone()));
        Ok(())
    }

    fn node_id_changed(&self, node_id: &NodeId, new_id: &NodeId) -> GraphChangeResult<()> {
        self.record(GraphDiff::node_id_changed(node_id.clone(), new_id.clone()));
        Ok(())
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
        ));
        Ok(())
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
        ));
        Ok(())
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
        ));
        Ok(())
    }
}

impl DiffRecorder for ChangeRecorder {
    fn is_recording(&self) -> bool {
        ChangeRecorder::is_recording(self)
    }

    fn set_recording(&self, recording: bool) {
        ChangeRecorder::set_recording(self, recording)
    }

    fn diffs(&self) -> GraphDiff {
        ChangeRecorder::diffs(self)
    }

    fn clear(&self) {
        ChangeRecorder::clear(self)
    }

    fn size(&self) -> usize {
        ChangeRecorder::size(self)
    }

    fn is_empty(&self) -> bool {
        ChangeRecorder::is_empty(self)
    }
}
