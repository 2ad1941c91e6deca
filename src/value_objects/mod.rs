//! Object graph value objects
//!
//! Value objects identify nodes and arcs inside one object graph. They carry no
//! references to live objects, so anything built from them (diffs, events,
//! wire frames) can cross process boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Raw property value carried by diffs and qualifier literals.
pub type PropertyValue = serde_json::Value;

/// Key part of a [`NodeId`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKey {
    /// Client-side id assigned before the object is committed
    Temporary(Uuid),
    /// Id derived from the stored primary key
    Permanent(String),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Temporary(uuid) => write!(f, "<temp:{uuid}>"),
            NodeKey::Permanent(key) => write!(f, "{key}"),
        }
    }
}

/// Identifies a node within one graph instance.
///
/// Uniqueness holds inside a single graph only: two graphs may register
/// different objects under equal ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    entity_name: String,
    key: NodeKey,
}

impl NodeId {
    /// Create a temporary id for a new, uncommitted object
    pub fn temporary(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            key: NodeKey::Temporary(Uuid::new_v4()),
        }
    }

    /// Create a permanent id from a stored primary key
    pub fn permanent(entity_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            key: NodeKey::Permanent(key.into()),
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.key, NodeKey::Temporary(_))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_name, self.key)
    }
}

/// Names one outgoing arc of a node, conventionally a relationship name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArcId(String);

impl ArcId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArcId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ArcId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Declared multiplicity of a relationship arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// Single-valued relationship
    ToOne,
    /// Collection-valued relationship
    ToMany,
}
