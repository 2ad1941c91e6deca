//! Map-backed generic node
//!
//! A `DataObject` stores its attribute values and relationship targets in
//! maps keyed by name and validates writes against its [`ObjEntity`].
//! Relationship targets are held weakly; the [`GraphMap`](crate::aggregate::GraphMap)
//! owns live nodes, so inverse relationships never keep each other alive.

use super::{same_node, GraphNode, NodeHandle, PropertyAccessError, Relationship, WeakNodeHandle};
use crate::schema::ObjEntity;
use crate::value_objects::{ArcId, Cardinality, PropertyValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Generic node whose shape comes from an [`ObjEntity`]
pub struct DataObject {
    entity: Arc<ObjEntity>,
    values: HashMap<String, PropertyValue>,
    to_one: HashMap<String, WeakNodeHandle>,
    to_many: HashMap<String, Vec<WeakNodeHandle>>,
}

impl DataObject {
    /// Create an empty object of `entity`
    pub fn new(entity: Arc<ObjEntity>) -> Self {
        Self {
            entity,
            values: HashMap::new(),
            to_one: HashMap::new(),
            to_many: HashMap::new(),
        }
    }

    /// Builder-style attribute write, for seeding objects
    pub fn with_value(
        mut self,
        name: &str,
        value: PropertyValue,
    ) -> Result<Self, PropertyAccessError> {
        self.write_property(name, value)?;
        Ok(self)
    }

    /// Entity metadata this object is validated against
    pub fn entity(&self) -> &ObjEntity {
        &self.entity
    }

    fn declared(&self, arc_id: &ArcId) -> Result<Cardinality, PropertyAccessError> {
        self.cardinality(arc_id)
            .ok_or_else(|| PropertyAccessError::UnknownRelationship(arc_id.to_string()))
    }

    fn expect(&self, arc_id: &ArcId, expected: Cardinality) -> Result<(), PropertyAccessError> {
        let actual = self.declared(arc_id)?;
        if actual != expected {
            return Err(PropertyAccessError::WrongCardinality {
                arc: arc_id.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl GraphNode for DataObject {
    fn entity_name(&self) -> &str {
        &self.entity.name
    }

    fn read_property(&self, name: &str) -> Option<PropertyValue> {
        self.entity.attribute(name)?;
        Some(
            self.values
                .get(name)
                .cloned()
                .unwrap_or(PropertyValue::Null),
        )
    }

    fn write_property(
        &mut self,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), PropertyAccessError> {
        let Some(attribute) = self.entity.attribute(name) else {
            if self.entity.relationship(name).is_some() {
                return Err(PropertyAccessError::NotAnAttribute(name.to_string()));
            }
            return Err(PropertyAccessError::UnknownProperty(name.to_string()));
        };

        if !attribute.accepts(&value) {
            return Err(PropertyAccessError::TypeMismatch {
                property: name.to_string(),
                expected: attribute.value_type.clone(),
                actual: value.to_string(),
            });
        }

        self.values.insert(name.to_string(), value);
        Ok(())
    }

    fn cardinality(&self, arc_id: &ArcId) -> Option<Cardinality> {
        self.entity
            .relationship(arc_id.as_str())
            .map(|rel| rel.cardinality())
    }

    fn relationship(&self, arc_id: &ArcId) -> Result<Relationship, PropertyAccessError> {
        Ok(match self.declared(arc_id)? {
            Cardinality::ToOne => {
                Relationship::ToOne(self.to_one.get(arc_id.as_str()).and_then(|t| t.upgrade()))
            }
            // Targets dropped elsewhere are skipped.
            Cardinality::ToMany => Relationship::ToMany(
                self.to_many
                    .get(arc_id.as_str())
                    .map(|targets| targets.iter().filter_map(|t| t.upgrade()).collect())
                    .unwrap_or_default(),
            ),
        })
    }

    fn set_to_one(
        &mut self,
        arc_id: &ArcId,
        target: Option<NodeHandle>,
    ) -> Result<(), PropertyAccessError> {
        self.expect(arc_id, Cardinality::ToOne)?;
        match target {
            Some(target) => {
                self.to_one
                    .insert(arc_id.to_string(), Arc::downgrade(&target));
            }
            None => {
                self.to_one.remove(arc_id.as_str());
            }
        }
        Ok(())
    }

    fn add_to_many(
        &mut self,
        arc_id: &ArcId,
        target: NodeHandle,
    ) -> Result<(), PropertyAccessError> {
        self.expect(arc_id, Cardinality::ToMany)?;
        self.to_many
            .entry(arc_id.to_string())
            .or_default()
            .push(Arc::downgrade(&target));
        Ok(())
    }

    fn remove_from_many(
        &mut self,
        arc_id: &ArcId,
        target: &NodeHandle,
    ) -> Result<bool, PropertyAccessError> {
        self.expect(arc_id, Cardinality::ToMany)?;
        let Some(targets) = self.to_many.get_mut(arc_id.as_str()) else {
            return Ok(false);
        };
        let mut removed = false;
        targets.retain(|t| match t.upgrade() {
            Some(live) if same_node(&live, target) => {
                removed = true;
                false
            }
            Some(_) => true,
            None => false,
        });
        Ok(removed)
    }
}

// Relationship targets are summarized to avoid walking cycles.
impl fmt::Debug for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataObject")
            .field("entity", &self.entity.name)
            .field("values", &self.values)
            .field("to_one", &self.to_one.keys().collect::<Vec<_>>())
            .field("to_many", &self.to_many.keys().collect::<Vec<_>>())
            .finish()
    }
}
