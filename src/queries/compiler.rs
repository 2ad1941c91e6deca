//! Qualifier compiler
//!
//! Walks a parsed property-list qualifier (maps tagged with a `class`
//! discriminator) and produces an [`Expression`]. Compilation is a pure
//! function of its input.

use super::expression::{ComparisonOperator, ComparisonValue, Expression};
use super::{QualifierError, QualifierResult};
use serde_json::{Map, Number, Value};

pub const AND_QUALIFIER: &str = "EOAndQualifier";
pub const OR_QUALIFIER: &str = "EOOrQualifier";
pub const NOT_QUALIFIER: &str = "EONotQualifier";
pub const KEY_VALUE_QUALIFIER: &str = "EOKeyValueQualifier";
pub const KEY_COMPARISON_QUALIFIER: &str = "EOKeyComparisonQualifier";
pub const QUALIFIER_VARIABLE: &str = "EOQualifierVariable";
pub const NUMBER_VALUE: &str = "NSNumber";
pub const DECIMAL_NUMBER_VALUE: &str = "NSDecimalNumber";
pub const NULL_VALUE: &str = "EONull";

const CLASS_KEY: &str = "class";
const QUALIFIERS_KEY: &str = "qualifiers";
const QUALIFIER_KEY: &str = "qualifier";
const KEY_KEY: &str = "key";
const SELECTOR_KEY: &str = "selectorName";
const VALUE_KEY: &str = "value";
const VARIABLE_NAME_KEY: &str = "_key";

/// Selector names accepted in stored qualifiers
static SELECTOR_BRIDGE: &[(&str, ComparisonOperator)] = &[
    ("isEqualTo:", ComparisonOperator::Equal),
    ("=", ComparisonOperator::Equal),
    ("isNotEqualTo:", ComparisonOperator::NotEqual),
    ("<>", ComparisonOperator::NotEqual),
    ("!=", ComparisonOperator::NotEqual),
    ("isLike:", ComparisonOperator::Like),
    ("like", ComparisonOperator::Like),
    ("isCaseInsensitiveLike:", ComparisonOperator::LikeIgnoreCase),
    ("caseInsensitiveLike", ComparisonOperator::LikeIgnoreCase),
    ("isLessThan:", ComparisonOperator::LessThan),
    ("<", ComparisonOperator::LessThan),
    ("isLessThanOrEqualTo:", ComparisonOperator::LessOrEqual),
    ("<=", ComparisonOperator::LessOrEqual),
    ("isGreaterThan:", ComparisonOperator::GreaterThan),
    (">", ComparisonOperator::GreaterThan),
    ("isGreaterThanOrEqualTo:", ComparisonOperator::GreaterOrEqual),
    (">=", ComparisonOperator::GreaterOrEqual),
];

/// Look up the operator for a selector name
pub fn operator_for_selector(selector: &str) -> Option<ComparisonOperator> {
    SELECTOR_BRIDGE
        .iter()
        .find(|(name, _)| *name == selector)
        .map(|(_, operator)| *operator)
}

/// Compile a parsed qualifier into an expression tree
pub fn compile_qualifier(node: &Value) -> QualifierResult<Expression> {
    QualifierCompiler.compile(node)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QualifierCompiler;

impl QualifierCompiler {
    pub fn compile(&self, node: &Value) -> QualifierResult<Expression> {
        let map = node
            .as_object()
            .ok_or_else(|| QualifierError::MalformedNode(format!("expected a map, found {node}")))?;

        // An untagged node is compiled as a key/value comparison.
        match class_of(map)? {
            Some(AND_QUALIFIER) => Ok(Expression::and(self.compile_children(AND_QUALIFIER, map)?)),
            Some(OR_QUALIFIER) => Ok(Expression::or(self.compile_children(OR_QUALIFIER, map)?)),
            Some(NOT_QUALIFIER) => {
                let child = map
                    .get(QUALIFIER_KEY)
                    .ok_or_else(|| missing(NOT_QUALIFIER, QUALIFIER_KEY))?;
                Ok(!self.compile(child)?)
            }
            Some(KEY_COMPARISON_QUALIFIER) => Err(QualifierError::Unsupported {
                class: KEY_COMPARISON_QUALIFIER.to_string(),
            }),
            class => self.compile_comparison(class.unwrap_or(KEY_VALUE_QUALIFIER), map),
        }
    }

    fn compile_children(
        &self,
        class: &str,
        map: &Map<String, Value>,
    ) -> QualifierResult<Vec<Expression>> {
        let children = map
            .get(QUALIFIERS_KEY)
            .ok_or_else(|| missing(class, QUALIFIERS_KEY))?
            .as_array()
            .ok_or_else(|| {
                QualifierError::MalformedNode(format!("{class}.{QUALIFIERS_KEY} must be a list"))
            })?;

        children.iter().map(|child| self.compile(child)).collect()
    }

    fn compile_comparison(
        &self,
        class: &str,
        map: &Map<String, Value>,
    ) -> QualifierResult<Expression> {
        let path = required_str(class, map, KEY_KEY)?;
        let selector = required_str(class, map, SELECTOR_KEY)?;
        let operator = operator_for_selector(selector)
            .ok_or_else(|| QualifierError::UnknownSelector(selector.to_string()))?;

        let value = match map.get(VALUE_KEY) {
            None => ComparisonValue::Literal(Value::Null),
            Some(Value::Object(nested)) => compile_nested_value(nested)?,
            Some(scalar) => ComparisonValue::Literal(scalar.clone()),
        };

        Ok(Expression::comparison(operator, path, value))
    }
}

fn compile_nested_value(nested: &Map<String, Value>) -> QualifierResult<ComparisonValue> {
    match class_of(nested)? {
        Some(QUALIFIER_VARIABLE) => Ok(ComparisonValue::Parameter(
            required_str(QUALIFIER_VARIABLE, nested, VARIABLE_NAME_KEY)?.to_string(),
        )),
        Some(class @ (NUMBER_VALUE | DECIMAL_NUMBER_VALUE)) => {
            let raw = nested.get(VALUE_KEY).ok_or_else(|| missing(class, VALUE_KEY))?;
            parse_number(raw).map(ComparisonValue::Literal)
        }
        Some(NULL_VALUE) => Ok(ComparisonValue::Literal(Value::Null)),
        _ => Ok(ComparisonValue::Literal(
            nested
                .get(VALUE_KEY)
                .cloned()
                .unwrap_or_else(|| Value::Object(nested.clone())),
        )),
    }
}

fn parse_number(raw: &Value) -> QualifierResult<Value> {
    match raw {
        Value::Number(_) => Ok(raw.clone()),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(int) = text.parse::<i64>() {
                return Ok(Value::from(int));
            }
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| QualifierError::InvalidNumber(text.to_string()))
        }
        other => Err(QualifierError::InvalidNumber(other.to_string())),
    }
}

fn class_of(map: &Map<String, Value>) -> QualifierResult<Option<&str>> {
    match map.get(CLASS_KEY) {
        None => Ok(None),
        Some(Value::String(class)) => Ok(Some(class.as_str())),
        Some(other) => Err(QualifierError::MalformedNode(format!(
            "class tag must be a string, found {other}"
        ))),
    }
}

fn required_str<'a>(
    class: &str,
    map: &'a Map<String, Value>,
    field: &str,
) -> QualifierResult<&'a str> {
    match map.get(field) {
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(other) => Err(QualifierError::MalformedNode(format!(
            "{class}.{field} must be a string, found {other}"
        ))),
        None => Err(missing(class, field)),
    }
}

fn missing(class: &str, field: &str) -> QualifierError {
    QualifierError::MissingField {
        class: class.to_string(),
        field: field.to_string(),
    }
}
