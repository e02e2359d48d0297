//! In-memory evaluation of a [`ComposedQuery`] against JSON documents.
//!
//! Mirrors the store translation: numeric-looking text in a range operand is
//! compared as a number, equality on numeric-looking text matches either the
//! text or the number, and values of different kinds never match.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::clause::{FieldCondition, FilterClause, RangeOperator, Scalar, SearchClause};
use crate::composer::ComposedQuery;

impl ComposedQuery {
    /// Whether `document` falls inside the scope, search and filter.
    /// The page window is not considered.
    pub fn matches(&self, document: &Value) -> bool {
        self.scope.matches(document) && self.search.matches(document) && self.filter.matches(document)
    }
}

impl FilterClause {
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }
}

impl SearchClause {
    pub fn matches(&self, document: &Value) -> bool {
        let Some(keyword) = &self.keyword else {
            return true;
        };
        let needle = keyword.to_lowercase();
        lookup(document, &self.field)
            .into_iter()
            .any(|v| matches!(v, Value::String(s) if s.to_lowercase().contains(&needle)))
    }
}

impl FieldCondition {
    /// Array fields match when any element matches.
    pub fn matches(&self, document: &Value) -> bool {
        let operand = match (self.operator, &self.operand) {
            (RangeOperator::Equals, operand) => operand.clone(),
            (_, Scalar::Text(text)) => numeric_text(text).unwrap_or_else(|| self.operand.clone()),
            (_, operand) => operand.clone(),
        };

        lookup(document, &self.field)
            .into_iter()
            .filter_map(|value| compare(value, &operand))
            .any(|ordering| accepts(self.operator, ordering))
    }
}

fn accepts(operator: RangeOperator, ordering: Ordering) -> bool {
    match operator {
        RangeOperator::Equals => ordering == Ordering::Equal,
        RangeOperator::GreaterThan => ordering == Ordering::Greater,
        RangeOperator::GreaterOrEqual => ordering != Ordering::Less,
        RangeOperator::LessThan => ordering == Ordering::Less,
        RangeOperator::LessOrEqual => ordering != Ordering::Greater,
    }
}

fn numeric_text(text: &str) -> Option<Scalar> {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Scalar::Number)
}

/// Ordering of a stored value relative to an operand, `None` when incomparable.
fn compare(value: &Value, operand: &Scalar) -> Option<Ordering> {
    match (value, operand) {
        (Value::Number(a), Scalar::Number(_) | Scalar::Text(_)) => {
            let a = a.as_f64()?;
            let b = operand.as_f64()?;
            Some(a.total_cmp(&b))
        }
        (Value::String(a), Scalar::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::String(a), Scalar::Uuid(b)) => Some(a.as_str().cmp(b.to_string().as_str())),
        (Value::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Values reached by a dotted path, stepping through arrays along the way.
fn lookup<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![document];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => next.extend(map.get(segment)),
                Value::Array(items) => next.extend(
                    items
                        .iter()
                        .filter_map(|item| item.as_object().and_then(|m| m.get(segment))),
                ),
                _ => {}
            }
        }
        current = next;
    }

    current
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .collect()
}
