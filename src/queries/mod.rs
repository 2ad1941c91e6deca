//! Stored query qualifiers
//!
//! Query definitions are read from static configuration as parsed property
//! lists. Their qualifiers are compiled once into immutable [`Expression`]
//! trees and consumed whenever the query is turned into executable SQL.

pub mod compiler;
pub mod definition;
pub mod expression;
pub mod parameters;

pub use compiler::{compile_qualifier, operator_for_selector, QualifierCompiler};
pub use definition::{QueryDefinition, SortOrdering};
pub use expression::{AggregateKind, ComparisonOperator, ComparisonValue, Expression};
pub use parameters::{infer_parameter_bindings, BindingType, ParameterBinding};

/// Result type for qualifier compilation
pub type QualifierResult<T> = Result<T, QualifierError>;

/// Errors that stop compilation of a query definition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QualifierError {
    /// Qualifier kind that has no faithful translation
    #[error("Unsupported qualifier class: {class}")]
    Unsupported { class: String },

    #[error("Unknown comparison selector: {0}")]
    UnknownSelector(String),

    #[error("{class} is missing required field '{field}'")]
    MissingField { class: String, field: String },

    #[error("Malformed qualifier node: {0}")]
    MalformedNode(String),

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("No value bound for parameter '{0}'")]
    MissingParameter(String),

    #[error("Invalid query definition: {0}")]
    InvalidDefinition(String),
}
