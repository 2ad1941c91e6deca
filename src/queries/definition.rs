//! Stored query definitions
//!
//! A stored fetch specification as found in a model's query section: the
//! root entity, an optional qualifier and the fetch options that go with it.

use super::compiler::compile_qualifier;
use super::expression::Expression;
use super::parameters::{infer_parameter_bindings, ParameterBinding};
use super::{QualifierError, QualifierResult};
use crate::schema::EntityResolver;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ENTITY_NAME_KEY: &str = "entityName";
const QUALIFIER_KEY: &str = "qualifier";
const FETCH_LIMIT_KEY: &str = "fetchLimit";
const USES_DISTINCT_KEY: &str = "usesDistinct";
const SORT_ORDERINGS_KEY: &str = "sortOrderings";
const PREFETCHES_KEY: &str = "prefetchingRelationshipKeyPaths";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrdering {
    pub key: String,
    pub ascending: bool,
    pub case_insensitive: bool,
}

impl SortOrdering {
    /// Build an ordering from a `compare...:` selector name
    pub fn from_selector(key: impl Into<String>, selector: &str) -> QualifierResult<Self> {
        let (ascending, case_insensitive) = match selector {
            "compareAscending:" => (true, false),
            "compareDescending:" => (false, false),
            "compareCaseInsensitiveAscending:" => (true, true),
            "compareCaseInsensitiveDescending:" => (false, true),
            other => return Err(QualifierError::UnknownSelector(other.to_string())),
        };
        Ok(Self {
            key: key.into(),
            ascending,
            case_insensitive,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub name: String,
    pub root_entity: String,
    pub qualifier: Option<Expression>,
    /// `None` means no limit
    pub fetch_limit: Option<usize>,
    pub distinct: bool,
    pub orderings: Vec<SortOrdering>,
    pub prefetches: Vec<String>,
}

impl QueryDefinition {
    /// Read a definition from its parsed property-list form
    pub fn from_plist(name: impl Into<String>, plist: &Value) -> QualifierResult<Self> {
        let name = name.into();
        let map = plist.as_object().ok_or_else(|| {
            QualifierError::InvalidDefinition(format!("query '{name}' is not a map"))
        })?;

        let root_entity = match map.get(ENTITY_NAME_KEY) {
            Some(Value::String(entity)) => entity.clone(),
            _ => {
                return Err(QualifierError::InvalidDefinition(format!(
                    "query '{name}' has no {ENTITY_NAME_KEY}"
                )))
            }
        };

        let qualifier = map.get(QUALIFIER_KEY).map(compile_qualifier).transpose()?;

        Ok(Self {
            fetch_limit: fetch_limit(&name, map)?,
            distinct: map.get(USES_DISTINCT_KEY).map(plist_bool).unwrap_or(false),
            orderings: orderings(&name, map)?,
            prefetches: string_list(&name, map, PREFETCHES_KEY)?,
            name,
            root_entity,
            qualifier,
        })
    }

    /// Infer bindings for the qualifier's parameters; empty without a qualifier
    pub fn parameter_bindings<R: EntityResolver + ?Sized>(
        &self,
        resolver: &R,
    ) -> Vec<ParameterBinding> {
        self.qualifier
            .as_ref()
            .map(|qualifier| infer_parameter_bindings(qualifier, &self.root_entity, resolver))
            .unwrap_or_default()
    }
}

fn fetch_limit(name: &str, map: &Map<String, Value>) -> QualifierResult<Option<usize>> {
    let limit = match map.get(FETCH_LIMIT_KEY) {
        None => return Ok(None),
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    match limit {
        Some(0) => Ok(None),
        Some(limit) => usize::try_from(limit).map(Some).map_err(|_| invalid_fetch_limit(name)),
        None => Err(invalid_fetch_limit(name)),
    }
}

fn invalid_fetch_limit(name: &str) -> QualifierError {
    QualifierError::InvalidDefinition(format!("query '{name}' has an invalid {FETCH_LIMIT_KEY}"))
}

// Property lists store booleans as strings.
fn plist_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(text.as_str(), "YES" | "true" | "1"),
        Value::Number(number) => number.as_u64().is_some_and(|n| n != 0),
        _ => false,
    }
}

fn orderings(name: &str, map: &Map<String, Value>) -> QualifierResult<Vec<SortOrdering>> {
    let Some(raw) = map.get(SORT_ORDERINGS_KEY) else {
        return Ok(Vec::new());
    };
    let entries = raw.as_array().ok_or_else(|| {
        QualifierError::InvalidDefinition(format!("query '{name}': {SORT_ORDERINGS_KEY} must be a list"))
    })?;

    entries
        .iter()
        .map(|entry| {
            let key = entry.get("key").and_then(Value::as_str).ok_or_else(|| {
                QualifierError::InvalidDefinition(format!("query '{name}': sort ordering without key"))
            })?;
            let selector = entry
                .get("selectorName")
                .and_then(Value::as_str)
                .unwrap_or("compareAscending:");
            SortOrdering::from_selector(key, selector)
        })
        .collect()
}

fn string_list(name: &str, map: &Map<String, Value>, field: &str) -> QualifierResult<Vec<String>> {
    match map.get(field) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    QualifierError::InvalidDefinition(format!(
                        "query '{name}': {field} must contain strings"
                    ))
                })
            })
            .collect(),
        Some(_) => Err(QualifierError::InvalidDefinition(format!(
            "query '{name}': {field} must be a list"
        ))),
    }
}
