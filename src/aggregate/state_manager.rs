//! Graph state manager
//!
//! Coordinates one graph's node registry with an optional recorder for local
//! changes and an optional merger for external ones. Recording is suspended
//! while an external diff is merged so merged changes are never mistaken for
//! local ones and re-broadcast.

use super::GraphMap;
use crate::components::NodeHandle;
use crate::config::GraphSyncConfig;
use crate::events::GraphDiff;
use crate::handlers::{DiffRecorder, GraphChangeHandler, GraphChangeResult, ObjectGraphMerger};
use crate::value_objects::NodeId;
use parking_lot::ReentrantMutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Coordinates local recording and remote merging for one graph.
///
/// Merges run with the recorder suspended so replicated changes are never
/// re-recorded as local ones.
pub struct GraphStateManager {
    graph_map: Arc<GraphMap>,
    recorder: Option<Arc<dyn DiffRecorder>>,
    merger: Option<Arc<dyn GraphChangeHandler>>,
    // Reentrant so merge callbacks may register nodes on the same thread.
    lock: ReentrantMutex<()>,
}

/// Turns recording off for its lifetime and restores it on drop, including
/// during unwinding.
struct RecordingSuspension<'a> {
    recorder: &'a dyn DiffRecorder,
    was_recording: bool,
}

impl<'a> RecordingSuspension<'a> {
    fn new(recorder: &'a dyn DiffRecorder) -> Self {
        let was_recording = recorder.is_recording();
        recorder.set_recording(false);
        Self {
            recorder,
            was_recording,
        }
    }
}

impl Drop for RecordingSuspension<'_> {
    fn drop(&mut self) {
        if self.was_recording {
            self.recorder.set_recording(true);
        }
    }
}

impl GraphStateManager {
    /// Create a manager over `graph_map` with neither recorder nor merger
    pub fn new(graph_map: Arc<GraphMap>) -> Self {
        Self {
            graph_map,
            recorder: None,
            merger: None,
            lock: ReentrantMutex::new(()),
        }
    }

    /// Create a manager with an [`ObjectGraphMerger`] over its own registry
    pub fn with_object_merger(config: &GraphSyncConfig) -> Self {
        let graph_map = Arc::new(GraphMap::new());
        let merger = ObjectGraphMerger::from_config(graph_map.clone(), config);
        Self::new(graph_map).with_merger(Arc::new(merger))
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn DiffRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_merger(mut self, merger: Arc<dyn GraphChangeHandler>) -> Self {
        self.merger = Some(merger);
        self
    }

    /// Registry of live nodes shared with the merger
    pub fn graph_map(&self) -> &Arc<GraphMap> {
        &self.graph_map
    }

    /// Recorder that local mutation code reports changes to
    pub fn recorder(&self) -> Option<&Arc<dyn DiffRecorder>> {
        self.recorder.as_ref()
    }

    pub fn get(&self, node_id: &NodeId) -> Option<NodeHandle> {
        let _guard = self.lock.lock();
        self.graph_map.get(node_id)
    }

    pub fn register_node(&self, node_id: NodeId, node: NodeHandle) {
        let _guard = self.lock.lock();
        self.graph_map.register(node_id, node);
    }

    pub fn unregister_node(&self, node_id: &NodeId) -> Option<NodeHandle> {
        let _guard = self.lock.lock();
        self.graph_map.unregister(node_id)
    }

    /// Apply a diff received from another graph.
    ///
    /// Without a merger the diff is dropped. Recording is suspended for the
    /// duration of the merge and restored afterwards even when the merge
    /// fails. A failure part way through a compound diff leaves the earlier
    /// operations applied.
    pub fn merge_change(&self, diff: &GraphDiff) -> GraphChangeResult<()> {
        let Some(merger) = &self.merger else {
            debug!(
                operations = diff.operation_count(),
                "No merger configured, dropping external graph change"
            );
            return Ok(());
        };

        let _guard = self.lock.lock();
        let _suspension = self
            .recorder
            .as_deref()
            .map(RecordingSuspension::new);

        diff.apply(merger.as_ref()).inspect_err(|error| {
            warn!(
                error = %error,
                operations = diff.operation_count(),
                "Merge of external graph change aborted"
            );
        })
    }
}
