//! Object graph synchronization for the Composable Information Machine
//!
//! Tracks mutations of a live object graph as replayable diffs, merges diffs
//! received from other graph instances back into live objects, and compiles
//! stored query qualifiers into typed expression trees.

pub mod aggregate;
pub mod components;
pub mod config;
pub mod events;
pub mod handlers;
pub mod infrastructure;
pub mod queries;
pub mod schema;
pub mod value_objects;

// Re-export main types
pub use aggregate::*;
pub use events::*;

// Re-export change handlers
pub use handlers::{
    ChangeRecorder, DiffRecorder, GraphChangeError, GraphChangeHandler, GraphChangeResult,
    ObjectGraphMerger, OperationRecorder,
};

// Re-export live node types
pub use components::{node_handle, same_node, DataObject, GraphNode, NodeHandle, Relationship};

// Re-export query compilation
pub use queries::{
    compile_qualifier, Expression, ParameterBinding, QualifierError, QualifierResult,
    QueryDefinition,
};

// Re-export schema metadata
pub use schema::{DataMap, EntityResolver, ObjAttribute, ObjEntity, ObjRelationship};

pub use config::{ConfigError, GraphSyncConfig};
pub use infrastructure::{DiffEnvelope, WireError};
pub use value_objects::{ArcId, Cardinality, NodeId, NodeKey, PropertyValue};
