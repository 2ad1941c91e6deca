//! Object-relational schema metadata
//!
//! Entities, attributes and relationships as loaded from a data map. The
//! qualifier layer resolves key paths against this metadata, and
//! [`DataObject`](crate::components::DataObject) uses it to validate property
//! writes and to know each relationship's cardinality up front.

use crate::value_objects::{Cardinality, PropertyValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while resolving schema paths or loading a data map
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Entity '{entity}' has no property '{property}'")]
    UnknownProperty { entity: String, property: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A mapped attribute with its declared value type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjAttribute {
    pub name: String,
    /// Declared value type, e.g. `java.lang.String` or `Integer`
    pub value_type: String,
}

impl ObjAttribute {
    pub fn new(name: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: value_type.into(),
        }
    }

    /// Whether `value` can be stored in this attribute.
    ///
    /// Null is always accepted. Unrecognized declared types accept anything.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        if value.is_null() {
            return true;
        }
        let simple = self
            .value_type
            .rsplit('.')
            .next()
            .unwrap_or(&self.value_type);
        match simple {
            "String" | "Character" | "char" => value.is_string(),
            "Integer" | "Long" | "Short" | "Byte" | "BigInteger" | "int" | "long" | "short"
            | "byte" => value.is_i64() || value.is_u64(),
            "Double" | "Float" | "BigDecimal" | "double" | "float" => value.is_number(),
            "Boolean" | "boolean" => value.is_boolean(),
            _ => true,
        }
    }
}

/// A mapped relationship to another entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjRelationship {
    pub name: String,
    pub target_entity: String,
    #[serde(default)]
    pub to_many: bool,
}

impl ObjRelationship {
    pub fn cardinality(&self) -> Cardinality {
        if self.to_many {
            Cardinality::ToMany
        } else {
            Cardinality::ToOne
        }
    }
}

/// A mapped entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjEntity {
    pub name: String,
    /// Class name of the objects this entity maps to
    pub class_name: String,
    #[serde(default)]
    attributes: IndexMap<String, ObjAttribute>,
    #[serde(default)]
    relationships: IndexMap<String, ObjRelationship>,
}

impl ObjEntity {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            attributes: IndexMap::new(),
            relationships: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value_type: &str) -> Self {
        self.attributes
            .insert(name.to_string(), ObjAttribute::new(name, value_type));
        self
    }

    pub fn with_relationship(mut self, name: &str, target_entity: &str, to_many: bool) -> Self {
        self.relationships.insert(
            name.to_string(),
            ObjRelationship {
                name: name.to_string(),
                target_entity: target_entity.to_string(),
                to_many,
            },
        );
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&ObjAttribute> {
        self.attributes.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&ObjRelationship> {
        self.relationships.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &ObjAttribute> {
        self.attributes.values()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &ObjRelationship> {
        self.relationships.values()
    }
}

/// Entity lookup used by qualifier parameter inference
pub trait EntityResolver {
    fn entity(&self, name: &str) -> Option<&ObjEntity>;
}

/// The last component of a resolved key path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedPath<'a> {
    Attribute(&'a ObjAttribute),
    /// Relationship plus the entity it points at
    Relationship(&'a ObjRelationship, &'a ObjEntity),
}

/// Resolve a dotted key path such as `toArtist.artistName` from `root`.
///
/// Every component except the last must be a relationship. A trailing `+`
/// (outer join marker) on a component is ignored.
pub fn resolve_path<'a, R: EntityResolver + ?Sized>(
    resolver: &'a R,
    root: &'a ObjEntity,
    path: &str,
) -> Result<ResolvedPath<'a>, SchemaError> {
    if path.is_empty() {
        return Err(SchemaError::InvalidPath {
            path: path.to_string(),
            reason: "empty path".to_string(),
        });
    }
    if path.starts_with("db:") {
        return Err(SchemaError::InvalidPath {
            path: path.to_string(),
            reason: "db paths are not resolved against object entities".to_string(),
        });
    }

    let mut entity = root;
    let mut components = path.split('.').peekable();
    while let Some(raw) = components.next() {
        let name = raw.trim_end_matches('+');
        let last = components.peek().is_none();

        if let Some(relationship) = entity.relationship(name) {
            let target = resolver
                .entity(&relationship.target_entity)
                .ok_or_else(|| SchemaError::UnknownEntity(relationship.target_entity.clone()))?;
            if last {
                return Ok(ResolvedPath::Relationship(relationship, target));
            }
            entity = target;
            continue;
        }

        match entity.attribute(name) {
            Some(attribute) if last => return Ok(ResolvedPath::Attribute(attribute)),
            Some(_) => {
                return Err(SchemaError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("'{name}' is an attribute and cannot be traversed"),
                })
            }
            None => {
                return Err(SchemaError::UnknownProperty {
                    entity: entity.name.clone(),
                    property: name.to_string(),
                })
            }
        }
    }

    Err(SchemaError::InvalidPath {
        path: path.to_string(),
        reason: "no components".to_string(),
    })
}

/// A named collection of entities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMap {
    pub name: String,
    #[serde(default)]
    entities: IndexMap<String, ObjEntity>,
}

impl DataMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: IndexMap::new(),
        }
    }

    pub fn with_entity(mut self, entity: ObjEntity) -> Self {
        self.add_entity(entity);
        self
    }

    pub fn add_entity(&mut self, entity: ObjEntity) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn entities(&self) -> impl Iterator<Item = &ObjEntity> {
        self.entities.values()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl EntityResolver for DataMap {
    fn entity(&self, name: &str) -> Option<&ObjEntity> {
        self.entities.get(name)
    }
}
