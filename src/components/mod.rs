//! Live graph nodes
//!
//! Mergers mutate objects through the [`GraphNode`] capability instead of
//! reflection. Each node declares the cardinality of its relationships ahead
//! of time, so arc merges never sniff runtime types.

pub mod data_object;

pub use data_object::DataObject;

use crate::value_objects::{ArcId, Cardinality, PropertyValue};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared reference to a live node
pub type NodeHandle = Arc<RwLock<dyn GraphNode>>;

/// Non-owning reference to a live node, used for relationship targets
pub type WeakNodeHandle = Weak<RwLock<dyn GraphNode>>;

/// Wrap a node in a [`NodeHandle`]
pub fn node_handle<N: GraphNode + 'static>(node: N) -> NodeHandle {
    Arc::new(RwLock::new(node))
}

/// Identity comparison of two handles
pub fn same_node(a: &NodeHandle, b: &NodeHandle) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Errors raised by property and relationship access on a node
#[derive(Debug, thiserror::Error)]
pub enum PropertyAccessError {
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("'{0}' is a relationship, not an attribute")]
    NotAnAttribute(String),

    #[error("property '{property}' expects {expected}, got {actual}")]
    TypeMismatch {
        property: String,
        expected: String,
        actual: String,
    },

    #[error("unknown relationship '{0}'")]
    UnknownRelationship(String),

    #[error("relationship '{arc}' is {actual:?}, not {expected:?}")]
    WrongCardinality {
        arc: String,
        expected: Cardinality,
        actual: Cardinality,
    },
}

/// Current value of a relationship arc
#[derive(Clone)]
pub enum Relationship {
    ToOne(Option<NodeHandle>),
    ToMany(Vec<NodeHandle>),
}

impl Relationship {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Relationship::ToOne(_) => Cardinality::ToOne,
            Relationship::ToMany(_) => Cardinality::ToMany,
        }
    }

    /// Whether `node` is referenced by this relationship
    pub fn contains(&self, node: &NodeHandle) -> bool {
        match self {
            Relationship::ToOne(Some(target)) => same_node(target, node),
            Relationship::ToOne(None) => false,
            Relationship::ToMany(targets) => targets.iter().any(|t| same_node(t, node)),
        }
    }
}

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::ToOne(target) => write!(f, "ToOne(set: {})", target.is_some()),
            Relationship::ToMany(targets) => write!(f, "ToMany(len: {})", targets.len()),
        }
    }
}

/// Property and relationship access a mergeable object must provide
pub trait GraphNode: Send + Sync {
    /// Name of the entity this node belongs to
    fn entity_name(&self) -> &str;

    /// Read a simple property; `None` when the property is unknown
    fn read_property(&self, name: &str) -> Option<PropertyValue>;

    /// Write a simple property
    fn write_property(&mut self, name: &str, value: PropertyValue)
        -> Result<(), PropertyAccessError>;

    /// Declared cardinality of `arc_id`, `None` if the node has no such arc
    fn cardinality(&self, arc_id: &ArcId) -> Option<Cardinality>;

    /// Snapshot of a relationship's current value
    fn relationship(&self, arc_id: &ArcId) -> Result<Relationship, PropertyAccessError>;

    /// Replace a to-one relationship
    fn set_to_one(
        &mut self,
        arc_id: &ArcId,
        target: Option<NodeHandle>,
    ) -> Result<(), PropertyAccessError>;

    /// Append to a to-many relationship
    fn add_to_many(&mut self, arc_id: &ArcId, target: NodeHandle)
        -> Result<(), PropertyAccessError>;

    /// Remove from a to-many relationship; returns whether the target was present
    fn remove_from_many(
        &mut self,
        arc_id: &ArcId,
        target: &NodeHandle,
    ) -> Result<bool, PropertyAccessError>;
}
