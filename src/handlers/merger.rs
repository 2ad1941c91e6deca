//! Object graph merger
//!
//! Applies externally originated changes to live nodes found in a
//! [`GraphMap`]. Callbacks naming nodes the map does not hold are ignored:
//! a partial or filtered graph is a supported view.

use super::{GraphChangeError, GraphChangeHandler, GraphChangeResult};
use crate::aggregate::GraphMap;
use crate::components::{same_node, NodeHandle, PropertyAccessError, Relationship};
use crate::config::GraphSyncConfig;
use crate::value_objects::{ArcId, Cardinality, NodeId, PropertyValue};
use std::sync::Arc;
use tracing::{debug, trace};

/// [`GraphChangeHandler`] that writes incoming changes into registered nodes
pub struct ObjectGraphMerger {
    graph_map: Arc<GraphMap>,
    verify_arc_deletion: bool,
}

impl ObjectGraphMerger {
    /// Merger over `graph_map` with arc deletion verification off
    pub fn new(graph_map: Arc<GraphMap>) -> Self {
        Self {
            graph_map,
            verify_arc_deletion: false,
        }
    }

    /// Merger configured from [`GraphSyncConfig::verify_arc_deletion`]
    pub fn from_config(graph_map: Arc<GraphMap>, config: &GraphSyncConfig) -> Self {
        Self::new(graph_map).with_verified_arc_deletion(config.verify_arc_deletion)
    }

    /// When enabled, deleting a to-one arc only clears it if it currently
    /// points at the deleted target.
    pub fn with_verified_arc_deletion(mut self, verify: bool) -> Self {
        self.verify_arc_deletion = verify;
        self
    }

    /// Registry the merger resolves node ids against
    pub fn graph_map(&self) -> &Arc<GraphMap> {
        &self.graph_map
    }

    fn source(&self, node_id: &NodeId, op: &'static str) -> Option<NodeHandle> {
        let node = self.graph_map.get(node_id);
        if node.is_none() {
            debug!(node_id = %node_id, op, "Ignoring change for unregistered node");
        }
        node
    }
}

fn relationship_error(node_id: &NodeId, arc_id: &ArcId, error: PropertyAccessError) -> GraphChangeError {
    match error {
        PropertyAccessError::UnknownRelationship(_) => GraphChangeError::UnknownRelationship {
            node_id: node_id.clone(),
            arc_id: arc_id.clone(),
        },
        other => GraphChangeError::PropertyAccess {
            node_id: node_id.clone(),
            property: arc_id.to_string(),
            reason: other.to_string(),
        },
    }
}

impl GraphChangeHandler for ObjectGraphMerger {
    // New objects arrive through fetches, not through diff replay.
    fn node_created(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        trace!(node_id = %node_id, "Node creation is not materialized by merge");
        Ok(())
    }

    fn node_deleted(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        self.graph_map.unregister(node_id);
        Ok(())
    }

    fn node_id_changed(&self, node_id: &NodeId, new_id: &NodeId) -> GraphChangeResult<()> {
        if !self.graph_map.rekey(node_id, new_id.clone()) {
            debug!(node_id = %node_id, new_id = %new_id, "Ignoring id change for unregistered node");
        }
        Ok(())
    }

    fn node_property_changed(
        &self,
        node_id: &NodeId,
        property: &str,
        _old_value: &PropertyValue,
        new_value: &PropertyValue,
    ) -> GraphChangeResult<()> {
        let Some(node) = self.source(node_id, "node_property_changed") else {
            return Ok(());
        };

        let result = node.write().write_property(property, new_value.clone());
        result.map_err(|e| GraphChangeError::PropertyAccess {
            node_id: node_id.clone(),
            property: property.to_string(),
            reason: e.to_string(),
        })
    }

    fn arc_created(
        &self,
        node_id: &NodeId,
        target_id: &NodeId,
        arc_id: &ArcId,
    ) -> GraphChangeResult<()> {
        let Some(node) = self.source(node_id, "arc_created") else {
            return Ok(());
        };
        let target = self.graph_map.get(target_id);

        let mut source = node.write();
        let cardinality =
            source
                .cardinality(arc_id)
                .ok_or_else(|| GraphChangeError::UnknownRelationship {
                    node_id: node_id.clone(),
                    arc_id: arc_id.clone(),
                })?;

        match cardinality {
            Cardinality::ToMany => {
                let Some(target) = target else {
                    debug!(node_id = %node_id, target_id = %target_id, "No live target to add");
                    return Ok(());
                };
                let current = source
                    .relationship(arc_id)
                    .map_err(|e| relationship_error(node_id, arc_id, e))?;
                if !current.contains(&target) {
                    source
                        .add_to_many(arc_id, target)
                        .map_err(|e| relationship_error(node_id, arc_id, e))?;
                }
            }
            Cardinality::ToOne => source
                .set_to_one(arc_id, target)
                .map_err(|e| relationship_error(node_id, arc_id, e))?,
        }
        Ok(())
    }

    fn arc_deleted(
        &self,
        node_id: &NodeId,
        target_id: &NodeId,
        arc_id: &ArcId,
    ) -> GraphChangeResult<()> {
        let Some(node) = self.source(node_id, "arc_deleted") else {
            return Ok(());
        };
        let target = self.graph_map.get(target_id);

        let mut source = node.write();
        let cardinality =
            source
                .cardinality(arc_id)
                .ok_or_else(|| GraphChangeError::UnknownRelationship {
                    node_id: node_id.clone(),
                    arc_id: arc_id.clone(),
                })?;

        match cardinality {
            Cardinality::ToMany => {
                if let Some(target) = target {
                    source
                        .remove_from_many(arc_id, &target)
                        .map_err(|e| relationship_error(node_id, arc_id, e))?;
                }
            }
            Cardinality::ToOne => {
                if self.verify_arc_deletion {
                    let current = source
                        .relationship(arc_id)
                        .map_err(|e| relationship_error(node_id, arc_id, e))?;
                    let points_at_target = match (&current, &target) {
                        (Relationship::ToOne(Some(current)), Some(target)) => {
                            same_node(current, target)
                        }
                        _ => false,
                    };
                    if !points_at_target {
                        debug!(node_id = %node_id, arc_id = %arc_id, "To-one arc does not point at deleted target");
                        return Ok(());
                    }
                }
                source
                    .set_to_one(arc_id, None)
                    .map_err(|e| relationship_error(node_id, arc_id, e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{node_handle, DataObject, GraphNode};
    use crate::schema::ObjEntity;
    use serde_json::json;

    struct Fixture {
        map: Arc<GraphMap>,
        artist_id: NodeId,
        painting_id: NodeId,
        artist: NodeHandle,
        painting: NodeHandle,
    }

    fn fixture() -> Fixture {
        let artist_entity = Arc::new(
            ObjEntity::new("Artist", "org.example.Artist")
                .with_attribute("artistName", "java.lang.String")
                .with_relationship("paintings", "Painting", true),
        );
        let painting_entity = Arc::new(
            ObjEntity::new("Painting", "org.example.Painting")
                .with_attribute("title", "java.lang.String")
                .with_relationship("toArtist", "Artist", false),
        );

        let map = Arc::new(GraphMap::new());
        let artist_id = NodeId::permanent("Artist", "1");
        let painting_id = NodeId::permanent("Painting", "2");
        let artist = node_handle(DataObject::new(artist_entity));
        let painting = node_handle(DataObject::new(painting_entity));
        map.register(artist_id.clone(), artist.clone());
        map.register(painting_id.clone(), painting.clone());

        Fixture {
            map,
            artist_id,
            painting_id,
            artist,
            painting,
        }
    }

    fn to_many_len(node: &NodeHandle, arc: &str) -> usize {
        match node.read().relationship(&ArcId::from(arc)).unwrap() {
            Relationship::ToMany(targets) => targets.len(),
            other => panic!("Expected to-many, got {other:?}"),
        }
    }

    #[test]
    fn test_property_change_sets_new_value() {
        let f = fixture();
        let merger = ObjectGraphMerger::new(f.map.clone());

        merger
            .node_property_changed(&f.artist_id, "artistName", &json!(null), &json!("Monet"))
            .unwrap();

        assert_eq!(
            f.artist.read().read_property("artistName"),
            Some(json!("Monet"))
        );
    }

    #[test]
    fn test_property_failure_names_property() {
        let f = fixture();
        let merger = ObjectGraphMerger::new(f.map.clone());

        let err = merger
            .node_property_changed(&f.artist_id, "nickname", &json!(null), &json!("x"))
            .unwrap_err();

        match err {
            GraphChangeError::PropertyAccess { property, .. } => assert_eq!(property, "nickname"),
            other => panic!("Expected PropertyAccess, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_nodes_are_ignored() {
        let f = fixture();
        let merger = ObjectGraphMerger::new(f.map.clone());
        let ghost = NodeId::permanent("Artist", "404");

        merger
            .node_property_changed(&ghost, "artistName", &json!(null), &json!("x"))
            .unwrap();
        merger
            .arc_created(&ghost, &f.painting_id, &ArcId::from("paintings"))
            .unwrap();
        merger
            .arc_deleted(&ghost, &f.painting_id, &ArcId::from("paintings"))
            .unwrap();
        merger.node_id_changed(&ghost, &NodeId::permanent("Artist", "405")).unwrap();

        assert_eq!(f.map.len(), 2);
    }

    #[test]
    fn test_to_many_arc_is_idempotent() {
        let f = fixture();
        let merger = ObjectGraphMerger::new(f.map.clone());
        let arc = ArcId::from("paintings");

        merger.arc_created(&f.artist_id, &f.painting_id, &arc).unwrap();
        merger.arc_created(&f.artist_id, &f.painting_id, &arc).unwrap();
        assert_eq!(to_many_len(&f.artist, "paintings"), 1);

        merger.arc_deleted(&f.artist_id, &f.painting_id, &arc).unwrap();
        merger.arc_deleted(&f.artist_id, &f.painting_id, &arc).unwrap();
        assert_eq!(to_many_len(&f.artist, "paintings"), 0);
    }

    #[test]
    fn test_to_one_arc_set_and_lenient_clear() {
        let f = fixture();
        let merger = ObjectGraphMerger::new(f.map.clone());
        let arc = ArcId::from("toArtist");

        merger.arc_created(&f.painting_id, &f.artist_id, &arc).unwrap();
        assert!(f
            .painting
            .read()
            .relationship(&arc)
            .unwrap()
            .contains(&f.artist));

        // Clears even though the named target is not the current value.
        let other = NodeId::permanent("Artist", "77");
        merger.arc_deleted(&f.painting_id, &other, &arc).unwrap();
        assert!(matches!(
            f.painting.read().relationship(&arc).unwrap(),
            Relationship::ToOne(None)
        ));
    }

    #[test]
    fn test_to_one_arc_verified_clear() {
        let f = fixture();
        let merger = ObjectGraphMerger::new(f.map.clone()).with_verified_arc_deletion(true);
        let arc = ArcId::from("toArtist");
        merger.arc_created(&f.painting_id, &f.artist_id, &arc).unwrap();

        let other = NodeId::permanent("Artist", "77");
        merger.arc_deleted(&f.painting_id, &other, &arc).unwrap();
        assert!(f.painting.read().relationship(&arc).unwrap().contains(&f.artist));

        merger.arc_deleted(&f.painting_id, &f.artist_id, &arc).unwrap();
        assert!(!f.painting.read().relationship(&arc).unwrap().contains(&f.artist));
    }

    #[test]
    fn test_to_one_with_missing_target_sets_null() {
        let f = fixture();
        let merger = ObjectGraphMerger::new(f.map.clone());
        let arc = ArcId::from("toArtist");
        merger.arc_created(&f.painting_id, &f.artist_id, &arc).unwrap();

        merger
            .arc_created(&f.painting_id, &NodeId::permanent("Artist", "404"), &arc)
            .unwrap();

        assert!(matches!(
            f.painting.read().relationship(&arc).unwrap(),
            Relationship::ToOne(None)
        ));
    }

    #[test]
    fn test_unknown_arc_is_an_error() {
        let f = fixture();
        let merger = ObjectGraphMerger::new(f.map.clone());

        let err = merger
            .arc_created(&f.artist_id, &f.painting_id, &ArcId::from("sculptures"))
            .unwrap_err();
        assert!(matches!(err, GraphChangeError::UnknownRelationship { .. }));
    }

    #[test]
    fn test_node_lifecycle_callbacks() {
        let f = fixture();
        let merger = ObjectGraphMerger::new(f.map.clone());
        let new_id = NodeId::permanent("Artist", "100");

        merger.node_created(&NodeId::temporary("Artist")).unwrap();
        assert_eq!(f.map.len(), 2);

        merger.node_id_changed(&f.artist_id, &new_id).unwrap();
        assert!(same_node(&f.map.get(&new_id).unwrap(), &f.artist));

        merger.node_deleted(&new_id).unwrap();
        assert!(f.map.get(&new_id).is_none());
    }
}
