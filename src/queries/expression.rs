//! Qualifier expression tree
//!
//! Compiled qualifiers are immutable trees of comparisons combined with
//! AND/OR/NOT. Comparison values are either literals or named parameters
//! bound at execution time.

use super::{QualifierError, QualifierResult};
use crate::value_objects::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Not;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Like,
    LikeIgnoreCase,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::Like => "like",
            ComparisonOperator::LikeIgnoreCase => "likeIgnoreCase",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComparisonValue {
    Literal(PropertyValue),
    /// Named placeholder substituted at execution time
    Parameter(String),
}

impl fmt::Display for ComparisonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonValue::Literal(value) => write!(f, "{value}"),
            ComparisonValue::Parameter(name) => write!(f, "${name}"),
        }
    }
}

/// Boolean combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateKind {
    And,
    Or,
    /// Exactly one child
    Not,
}

/// Compiled qualifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Comparison {
        operator: ComparisonOperator,
        /// Unresolved key path, e.g. `toArtist.artistName`
        path: String,
        value: ComparisonValue,
    },
    Aggregate {
        kind: AggregateKind,
        children: Vec<Expression>,
    },
    /// Result of folding an empty AND (true) or OR (false)
    Constant(bool),
}

impl Expression {
    pub fn comparison(
        operator: ComparisonOperator,
        path: impl Into<String>,
        value: ComparisonValue,
    ) -> Self {
        Expression::Comparison {
            operator,
            path: path.into(),
            value,
        }
    }

    /// Fold children with AND. No children yields `true`, one yields the child.
    pub fn and(children: Vec<Expression>) -> Self {
        Self::fold(AggregateKind::And, children, true)
    }

    /// Fold children with OR. No children yields `false`, one yields the child.
    pub fn or(children: Vec<Expression>) -> Self {
        Self::fold(AggregateKind::Or, children, false)
    }

    pub fn negate(child: Expression) -> Self {
        Expression::Aggregate {
            kind: AggregateKind::Not,
            children: vec![child],
        }
    }

    fn fold(kind: AggregateKind, mut children: Vec<Expression>, identity: bool) -> Self {
        match children.len() {
            0 => Expression::Constant(identity),
            1 => children.remove(0),
            _ => Expression::Aggregate { kind, children },
        }
    }

    /// Names of all parameters referenced in the tree
    pub fn parameter_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.visit_comparisons(&mut |_, _, value| {
            if let ComparisonValue::Parameter(name) = value {
                names.insert(name.clone());
            }
        });
        names
    }

    /// Call `visitor` with `(operator, path, value)` for each comparison, depth first
    pub fn visit_comparisons<F>(&self, visitor: &mut F)
    where
        F: FnMut(ComparisonOperator, &str, &ComparisonValue),
    {
        match self {
            Expression::Comparison {
                operator,
                path,
                value,
            } => visitor(*operator, path, value),
            Expression::Aggregate { children, .. } => {
                for child in children {
                    child.visit_comparisons(visitor);
                }
            }
            Expression::Constant(_) => {}
        }
    }

    /// Substitute every parameter; a parameter missing from `params` is an error
    pub fn with_parameters(
        &self,
        params: &HashMap<String, PropertyValue>,
    ) -> QualifierResult<Expression> {
        match self {
            Expression::Comparison {
                operator,
                path,
                value,
            } => {
                let value = match value {
                    ComparisonValue::Parameter(name) => params
                        .get(name)
                        .cloned()
                        .map(ComparisonValue::Literal)
                        .ok_or_else(|| QualifierError::MissingParameter(name.clone()))?,
                    literal => literal.clone(),
                };
                Ok(Expression::comparison(*operator, path.clone(), value))
            }
            Expression::Aggregate { kind, children } => Ok(Expression::Aggregate {
                kind: *kind,
                children: children
                    .iter()
                    .map(|child| child.with_parameters(params))
                    .collect::<QualifierResult<Vec<_>>>()?,
            }),
            Expression::Constant(value) => Ok(Expression::Constant(*value)),
        }
    }

    /// Substitute parameters, dropping comparisons whose parameter is missing.
    ///
    /// Returns `None` when nothing is left. A NOT whose child was dropped is
    /// dropped as well.
    pub fn with_parameters_pruned(
        &self,
        params: &HashMap<String, PropertyValue>,
    ) -> Option<Expression> {
        match self {
            Expression::Comparison {
                operator,
                path,
                value,
            } => {
                let value = match value {
                    ComparisonValue::Parameter(name) => {
                        ComparisonValue::Literal(params.get(name)?.clone())
                    }
                    literal => literal.clone(),
                };
                Some(Expression::comparison(*operator, path.clone(), value))
            }
            Expression::Aggregate { kind, children } => {
                let kept: Vec<_> = children
                    .iter()
                    .filter_map(|child| child.with_parameters_pruned(params))
                    .collect();
                if kept.is_empty() {
                    return None;
                }
                Some(match kind {
                    AggregateKind::And => Expression::and(kept),
                    AggregateKind::Or => Expression::or(kept),
                    AggregateKind::Not => Expression::Aggregate {
                        kind: AggregateKind::Not,
                        children: kept,
                    },
                })
            }
            Expression::Constant(value) => Some(Expression::Constant(*value)),
        }
    }
}

impl Not for Expression {
    type Output = Expression;

    fn not(self) -> Self::Output {
        Expression::negate(self)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Comparison {
                operator,
                path,
                value,
            } => write!(f, "{path} {operator} {value}"),
            Expression::Aggregate { kind, children } => {
                if *kind == AggregateKind::Not {
                    write!(f, "not ")?;
                    for child in children {
                        write!(f, "({child})")?;
                    }
                    return Ok(());
                }
                let joiner = if *kind == AggregateKind::And { " and " } else { " or " };
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write!(f, "({child})")?;
                }
                Ok(())
            }
            Expression::Constant(value) => write!(f, "{value}"),
        }
    }
}
