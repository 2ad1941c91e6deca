//! Graph change handlers
//!
//! Code that mutates an object graph reports each mutation through
//! [`GraphChangeHandler`]. Implementations either record the calls as
//! [`GraphDiff`](crate::events::GraphDiff) operations or apply them to live
//! objects. Calls arrive in the order the underlying mutations happened.

mod merger;
mod operation_recorder;
mod recorder;

pub use merger::ObjectGraphMerger;
pub use operation_recorder::OperationRecorder;
pub use recorder::{ChangeRecorder, DiffRecorder};

use crate::value_objects::{ArcId, NodeId, PropertyValue};
use std::sync::Arc;

/// Result type for graph change callbacks
pub type GraphChangeResult<T> = Result<T, GraphChangeError>;

/// Errors raised while recording or merging graph changes
#[derive(Debug, thiserror::Error)]
pub enum GraphChangeError {
    #[error("Failed to set property '{property}' on {node_id}: {reason}")]
    PropertyAccess {
        node_id: NodeId,
        property: String,
        reason: String,
    },

    #[error("Unknown relationship '{arc_id}' on {node_id}")]
    UnknownRelationship { node_id: NodeId, arc_id: ArcId },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Event publishing failed: {0}")]
    Publish(String),
}

/// Callback interface invoked for every graph mutation
pub trait GraphChangeHandler: Send + Sync {
    /// A node was created
    fn node_created(&self, node_id: &NodeId) -> GraphChangeResult<()>;

    /// A node was deleted
    fn node_deleted(&self, node_id: &NodeId) -> GraphChangeResult<()>;

    /// A node was re-keyed, e.g. a temporary id replaced after commit
    fn node_id_changed(&self, node_id: &NodeId, new_id: &NodeId) -> GraphChangeResult<()>;

    /// A simple property of a node changed value
    fn node_property_changed(
        &self,
        node_id: &NodeId,
        property: &str,
        old_value: &PropertyValue,
        new_value: &PropertyValue,
    ) -> GraphChangeResult<()>;

    /// An arc from `node_id` to `target_id` was created
    fn arc_created(&self, node_id: &NodeId, target_id: &NodeId, arc_id: &ArcId)
        -> GraphChangeResult<()>;

    /// An arc from `node_id` to `target_id` was deleted
    fn arc_deleted(&self, node_id: &NodeId, target_id: &NodeId, arc_id: &ArcId)
        -> GraphChangeResult<()>;
}

impl<T: GraphChangeHandler + ?Sized> GraphChangeHandler for Arc<T> {
    fn node_created(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        (**self).node_created(node_id)
    }

    fn node_deleted(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        (**self).node_deleted(node_id)
    }

    fn node_id_changed(&self, node_id: &NodeId, new_id: &NodeId) -> GraphChangeResult<()> {
        (**self).node_id_changed(node_id, new_id)
    }

    fn node_property_changed(
        &self,
        node_id: &NodeId,
        property: &str,
        old_value: &PropertyValue,
        new_value: &PropertyValue,
    ) -> GraphChangeResult<()> {
        (**self).node_property_changed(node_id, property, old_value, new_value)
    }

    fn arc_created(
        &self,
        node_id: &NodeId,
        target_id: &NodeId,
        arc_id: &ArcId,
    ) -> GraphChangeResult<()> {
        (**self).arc_created(node_id, target_id, arc_id)
    }

    fn arc_deleted(
        &self,
        node_id: &NodeId,
        target_id: &NodeId,
        arc_id: &ArcId,
    ) -> GraphChangeResult<()> {
        (**self).arc_deleted(node_id, target_id, arc_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_access_error_names_property() {
        let error = GraphChangeError::PropertyAccess {
            node_id: NodeId::permanent("Artist", "1"),
            property: "artistName".to_string(),
            reason: "type mismatch".to_string(),
        };

        let display = error.to_string();
        assert!(display.contains("artistName"));
        assert!(display.contains("Artist:1"));
    }
}
