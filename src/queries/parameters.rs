//! Parameter type inference
//!
//! Derives the free parameters of a compiled qualifier and the most specific
//! type each one is compared against, by resolving the comparison path
//! against schema metadata.

use super::expression::{ComparisonValue, Expression};
use crate::schema::{resolve_path, EntityResolver, ResolvedPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Type a bound parameter is compared against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingType {
    /// Declared value type of the attribute at the end of the path
    Attribute(String),
    /// Mapped class of the entity a relationship path points at
    Entity(String),
    /// The path could not be resolved
    Any,
}

impl fmt::Display for BindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingType::Attribute(value_type) => f.write_str(value_type),
            BindingType::Entity(class_name) => f.write_str(class_name),
            BindingType::Any => f.write_str("any"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBinding {
    pub name: String,
    pub binding_type: BindingType,
}

/// Infer a binding for every parameter in `expression`, sorted by name.
///
/// Paths are resolved from `root_entity`. Resolution failures degrade to
/// [`BindingType::Any`]. When a parameter appears in several comparisons the
/// first resolvable one determines its type.
pub fn infer_parameter_bindings<R: EntityResolver + ?Sized>(
    expression: &Expression,
    root_entity: &str,
    resolver: &R,
) -> Vec<ParameterBinding> {
    let root = resolver.entity(root_entity);
    if root.is_none() {
        debug!(root_entity, "Root entity not found, parameters are untyped");
    }

    let mut bindings: BTreeMap<String, BindingType> = BTreeMap::new();
    expression.visit_comparisons(&mut |_, path, value| {
        let ComparisonValue::Parameter(name) = value else {
            return;
        };
        if matches!(bindings.get(name), Some(known) if *known != BindingType::Any) {
            return;
        }

        let binding_type = root
            .map(|root| match resolve_path(resolver, root, path) {
                Ok(ResolvedPath::Attribute(attribute)) => {
                    BindingType::Attribute(attribute.value_type.clone())
                }
                Ok(ResolvedPath::Relationship(_, target)) => {
                    BindingType::Entity(target.class_name.clone())
                }
                Err(error) => {
                    debug!(parameter = %name, path, error = %error, "Untyped parameter binding");
                    BindingType::Any
                }
            })
            .unwrap_or(BindingType::Any);

        bindings.insert(name.clone(), binding_type);
    });

    bindings
        .into_iter()
        .map(|(name, binding_type)| ParameterBinding { name, binding_type })
        .collect()
}
