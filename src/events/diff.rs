//! Replayable graph diffs
//!
//! A [`GraphDiff`] stores only ids and raw values, never object references,
//! so a recorded change log can be serialized and replayed against another
//! graph instance. Applying or undoing a diff is pure dispatch onto a
//! [`GraphChangeHandler`].

use crate::handlers::{GraphChangeHandler, GraphChangeResult};
use crate::value_objects::{ArcId, NodeId, PropertyValue};
use serde::{Deserialize, Serialize};

/// A single graph mutation or an ordered group of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GraphDiff {
    /// A node was created
    NodeCreated {
        node_id: NodeId,
    },
    /// A node was deleted
    NodeDeleted {
        node_id: NodeId,
    },
    /// A node id was replaced
    NodeIdChanged {
        node_id: NodeId,
        new_node_id: NodeId,
    },
    /// A simple property changed value
    NodePropertyChanged {
        node_id: NodeId,
        property: String,
        old_value: PropertyValue,
        new_value: PropertyValue,
    },
    /// An arc was created
    ArcCreated {
        node_id: NodeId,
        target_node_id: NodeId,
        arc_id: ArcId,
    },
    /// An arc was deleted
    ArcDeleted {
        node_id: NodeId,
        target_node_id: NodeId,
        arc_id: ArcId,
    },
    /// Ordered sequence of diffs applied as a unit
    Compound {
        diffs: Vec<GraphDiff>,
    },
}

impl GraphDiff {
    /// A node came into existence
    pub fn node_created(node_id: NodeId) -> Self {
        Self::NodeCreated { node_id }
    }

    /// A node was removed
    pub fn node_deleted(node_id: NodeId) -> Self {
        Self::NodeDeleted { node_id }
    }

    /// A node was re-keyed, typically from a temporary to a permanent id
    pub fn node_id_changed(node_id: NodeId, new_node_id: NodeId) -> Self {
        Self::NodeIdChanged {
            node_id,
            new_node_id,
        }
    }

    /// An attribute moved from `old_value` to `new_value`
    pub fn property_changed(
        node_id: NodeId,
        property: impl Into<String>,
        old_value: PropertyValue,
        new_value: PropertyValue,
    ) -> Self {
        Self::NodePropertyChanged {
            node_id,
            property: property.into(),
            old_value,
            new_value,
        }
    }

    /// `node_id` gained a relationship to `target_node_id` along `arc_id`
    pub fn arc_created(node_id: NodeId, target_node_id: NodeId, arc_id: ArcId) -> Self {
        Self::ArcCreated {
            node_id,
            target_node_id,
            arc_id,
        }
    }

    /// `node_id` lost its relationship to `target_node_id` along `arc_id`
    pub fn arc_deleted(node_id: NodeId, target_node_id: NodeId, arc_id: ArcId) -> Self {
        Self::ArcDeleted {
            node_id,
            target_node_id,
            arc_id,
        }
    }

    /// Ordered group of diffs treated as one unit
    pub fn compound(diffs: Vec<GraphDiff>) -> Self {
        Self::Compound { diffs }
    }

    /// Replay this diff onto `handler`.
    ///
    /// Compound diffs replay their children in order and stop at the first
    /// error; children applied before the failure stay applied.
    pub fn apply<H: GraphChangeHandler + ?Sized>(&self, handler: &H) -> GraphChangeResult<()> {
        match self {
            Self::NodeCreated { node_id } => handler.node_created(node_id),
            Self::NodeDeleted { node_id } => handler.node_deleted(node_id),
            Self::NodeIdChanged {
                node_id,
                new_node_id,
            } => handler.node_id_changed(node_id, new_node_id),
            Self::NodePropertyChanged {
                node_id,
                property,
                old_value,
                new_value,
            } => handler.node_property_changed(node_id, property, old_value, new_value),
            Self::ArcCreated {
                node_id,
                target_node_id,
                arc_id,
            } => handler.arc_created(node_id, target_node_id, arc_id),
            Self::ArcDeleted {
                node_id,
                target_node_id,
                arc_id,
            } => handler.arc_deleted(node_id, target_node_id, arc_id),
            Self::Compound { diffs } => {
                for diff in diffs {
                    diff.apply(handler)?;
                }
                Ok(())
            }
        }
    }

    /// Replay the inverse of this diff onto `handler`.
    ///
    /// Compound diffs undo their children last to first.
    pub fn undo<H: GraphChangeHandler + ?Sized>(&self, handler: &H) -> GraphChangeResult<()> {
        match self {
            Self::NodeCreated { node_id } => handler.node_deleted(node_id),
            Self::NodeDeleted { node_id } => handler.node_created(node_id),
            Self::NodeIdChanged {
                node_id,
                new_node_id,
            } => handler.node_id_changed(new_node_id, node_id),
            Self::NodePropertyChanged {
                node_id,
                property,
                old_value,
                new_value,
            } => handler.node_property_changed(node_id, property, new_value, old_value),
            Self::ArcCreated {
                node_id,
                target_node_id,
                arc_id,
            } => handler.arc_deleted(node_id, target_node_id, arc_id),
            Self::ArcDeleted {
                node_id,
                target_node_id,
                arc_id,
            } => handler.arc_created(node_id, target_node_id, arc_id),
            Self::Compound { diffs } => {
                for diff in diffs.iter().rev() {
                    diff.undo(handler)?;
                }
                Ok(())
            }
        }
    }

    /// Build the diff whose `apply` performs this diff's `undo`
    pub fn inverse(&self) -> GraphDiff {
        match self {
            Self::NodeCreated { node_id } => Self::node_deleted(node_id.clone()),
            Self::NodeDeleted { node_id } => Self::node_created(node_id.clone()),
            Self::NodeIdChanged {
                node_id,
                new_node_id,
            } => Self::node_id_changed(new_node_id.clone(), node_id.clone()),
            Self::NodePropertyChanged {
                node_id,
                property,
                old_value,
                new_value,
            } => Self::property_changed(
                node_id.clone(),
                property.clone(),
                new_value.clone(),
                old_value.clone(),
            ),
            Self::ArcCreated {
                node_id,
                target_node_id,
                arc_id,
            } => Self::arc_deleted(node_id.clone(), target_node_id.clone(), arc_id.clone()),
            Self::ArcDeleted {
                node_id,
                target_node_id,
                arc_id,
            } => Self::arc_created(node_id.clone(), target_node_id.clone(), arc_id.clone()),
            Self::Compound { diffs } => {
                Self::compound(diffs.iter().rev().map(GraphDiff::inverse).collect())
            }
        }
    }

    /// True when applying the diff cannot change anything
    pub fn is_noop(&self) -> bool {
        match self {
            Self::NodePropertyChanged {
                old_value,
                new_value,
                ..
            } => old_value == new_value,
            Self::NodeIdChanged {
                node_id,
                new_node_id,
            } => node_id == new_node_id,
            Self::Compound { diffs } => diffs.iter().all(GraphDiff::is_noop),
            _ => false,
        }
    }

    /// Number of leaf operations, flattening nested compounds
    pub fn operation_count(&self) -> usize {
        match self {
            Self::Compound { diffs } => diffs.iter().map(GraphDiff::operation_count).sum(),
            _ => 1,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NodeCreated { .. } => "NodeCreated",
            Self::NodeDeleted { .. } => "NodeDeleted",
            Self::NodeIdChanged { .. } => "NodeIdChanged",
            Self::NodePropertyChanged { .. } => "NodePropertyChanged",
            Self::ArcCreated { .. } => "ArcCreated",
            Self::ArcDeleted { .. } => "ArcDeleted",
            Self::Compound { .. } => "Compound",
        }
    }
}

impl From<Vec<GraphDiff>> for GraphDiff {
    fn from(diffs: Vec<GraphDiff>) -> Self {
        Self::compound(diffs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ChangeRecorder;
    use serde_json::json;

    fn artist() -> NodeId {
        NodeId::permanent("Artist", "1")
    }

    fn painting() -> NodeId {
        NodeId::permanent("Painting", "7")
    }

    #[test]
    fn test_apply_dispatches_single_callback() {
        let recorder = ChangeRecorder::new();
        let diff = GraphDiff::property_changed(artist(), "artistName", json!("a"), json!("b"));

        diff.apply(&recorder).unwrap();

        assert_eq!(recorder.size(), 1);
        assert_eq!(recorder.diffs(), GraphDiff::compound(vec![diff]));
    }

    #[test]
    fn test_undo_swaps_property_values() {
        let recorder = ChangeRecorder::new();
        let diff = GraphDiff::property_changed(artist(), "artistName", json!("a"), json!("b"));

        diff.undo(&recorder).unwrap();

        let expected = GraphDiff::property_changed(artist(), "artistName", json!("b"), json!("a"));
        assert_eq!(recorder.diffs(), GraphDiff::compound(vec![expected]));
    }

    #[test]
    fn test_undo_inverts_structural_variants() {
        let arc = ArcId::from("paintings");
        let cases = vec![
            (
                GraphDiff::node_created(artist()),
                GraphDiff::node_deleted(artist()),
            ),
            (
                GraphDiff::node_deleted(artist()),
                GraphDiff::node_created(artist()),
            ),
            (
                GraphDiff::node_id_changed(artist(), painting()),
                GraphDiff::node_id_changed(painting(), artist()),
            ),
            (
                GraphDiff::arc_created(artist(), painting(), arc.clone()),
                GraphDiff::arc_deleted(artist(), painting(), arc.clone()),
            ),
            (
                GraphDiff::arc_deleted(artist(), painting(), arc.clone()),
                GraphDiff::arc_created(artist(), painting(), arc),
            ),
        ];

        for (diff, expected) in cases {
            let recorder = ChangeRecorder::new();
            diff.undo(&recorder).unwrap();
            assert_eq!(recorder.diffs(), GraphDiff::compound(vec![expected.clone()]));
            assert_eq!(diff.inverse(), expected);
        }
    }

    #[test]
    fn test_compound_undo_runs_in_reverse() {
        let arc = ArcId::from("toArtist");
        let diff = GraphDiff::compound(vec![
            GraphDiff::node_created(painting()),
            GraphDiff::arc_created(painting(), artist(), arc.clone()),
        ]);

        let recorder = ChangeRecorder::new();
        diff.undo(&recorder).unwrap();

        assert_eq!(
            recorder.diffs(),
            GraphDiff::compound(vec![
                GraphDiff::arc_deleted(painting(), artist(), arc),
                GraphDiff::node_deleted(painting()),
            ])
        );
        assert_eq!(diff.inverse().inverse(), diff);
    }

    #[test]
    fn test_noop_and_operation_count() {
        let same = GraphDiff::property_changed(artist(), "x", json!(1), json!(1));
        let nested = GraphDiff::compound(vec![
            same.clone(),
            GraphDiff::compound(vec![GraphDiff::node_created(artist()), same.clone()]),
        ]);

        assert!(same.is_noop());
        assert!(!nested.is_noop());
        assert!(GraphDiff::compound(vec![]).is_noop());
        assert_eq!(nested.operation_count(), 3);
    }

    #[test]
    fn test_wire_form_is_tagged() {
        let diff = GraphDiff::arc_created(artist(), painting(), ArcId::from("paintings"));
        let value = serde_json::to_value(&diff).unwrap();

        assert_eq!(value["op"], "arc_created");
        assert_eq!(value["arc_id"], "paintings");

        let back: GraphDiff = serde_json::from_value(value).unwrap();
        assert_eq!(back, diff);
    }
}
