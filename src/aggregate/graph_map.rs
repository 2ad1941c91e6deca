//! Node registry
//!
//! Maps node ids to live nodes for one graph. All access goes through a
//! single mutex around the backing table.

use crate::components::NodeHandle;
use crate::value_objects::NodeId;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::warn;

/// Thread-safe table of the live nodes in one graph, keyed by [`NodeId`]
#[derive(Default)]
pub struct GraphMap {
    nodes: Mutex<HashMap<NodeId, NodeHandle>>,
}

impl GraphMap {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node; `None` for unknown ids
    pub fn get(&self, node_id: &NodeId) -> Option<NodeHandle> {
        self.nodes.lock().get(node_id).cloned()
    }

    /// Register a node, silently replacing any node already under `node_id`
    pub fn register(&self, node_id: NodeId, node: NodeHandle) {
        self.nodes.lock().insert(node_id, node);
    }

    /// Remove and return the node registered under `node_id`
    pub fn unregister(&self, node_id: &NodeId) -> Option<NodeHandle> {
        self.nodes.lock().remove(node_id)
    }

    /// Move the node under `old_id` to `new_id` in one step, replacing any
    /// node already under `new_id`.
    /// Returns false when nothing was registered under `old_id`.
    pub fn rekey(&self, old_id: &NodeId, new_id: NodeId) -> bool {
        let mut nodes = self.nodes.lock();
        let Some(node) = nodes.remove(old_id) else {
            return false;
        };
        if nodes.insert(new_id.clone(), node).is_some() {
            warn!(%old_id, %new_id, "Node id change displaced an existing node");
        }
        true
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.lock().contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.lock().keys().cloned().collect()
    }
}
