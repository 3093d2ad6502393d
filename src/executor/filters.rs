//! Residual qualifier filtering
//!
//! Evaluates the qualifiers the store could not serve against raw records,
//! before any decoding happens.
//!
//! Rules:
//! - All qualifiers must match (AND semantics)
//! - A missing field never matches, not even `ne`
//! - Integers and floats compare numerically; strings lexicographically
//! - Any other type pairing never matches a range operator

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::mapping::{Entity, FieldType, Value};
use crate::planner::{FilterOp, Qualifier};
use crate::store::{RecordData, RecordKey};

/// Evaluates residual qualifiers against raw records
#[derive(Debug, Clone)]
pub struct ResidualFilter {
    qualifiers: Vec<Qualifier>,
    id_field: String,
    id_type: FieldType,
}

impl ResidualFilter {
    /// The identifier lives in the record key rather than the field data;
    /// qualifiers on `id_field` are evaluated against the key.
    pub fn new(qualifiers: Vec<Qualifier>, id_field: impl Into<String>, id_type: FieldType) -> Self {
        Self {
            qualifiers,
            id_field: id_field.into(),
            id_type,
        }
    }

    /// Filter for an entity type's records
    pub fn for_entity<E: Entity>(qualifiers: Vec<Qualifier>) -> Self {
        let id = E::descriptor().id();
        Self::new(qualifiers, id.name(), id.field_type())
    }

    pub fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }

    pub fn is_empty(&self) -> bool {
        self.qualifiers.is_empty()
    }

    /// Checks if a record matches all qualifiers
    pub fn matches(&self, key: &RecordKey, data: &RecordData) -> bool {
        self.qualifiers
            .iter()
            .all(|q| self.matches_qualifier(key, data, q))
    }

    fn lookup<'a>(&self, key: &'a RecordKey, data: &'a RecordData, field: &str) -> Option<Cow<'a, Value>> {
        if field == self.id_field {
            let value = match self.id_type {
                FieldType::Int => Value::Int(key.id.parse().ok()?),
                _ => Value::Str(key.id.clone()),
            };
            return Some(Cow::Owned(value));
        }
        data.get(field).map(Cow::Borrowed)
    }

    fn matches_qualifier(&self, key: &RecordKey, data: &RecordData, qualifier: &Qualifier) -> bool {
        let actual = match self.lookup(key, data, &qualifier.field) {
            Some(v) => v,
            None => return false,
        };
        let actual = actual.as_ref();

        match &qualifier.op {
            FilterOp::Eq(expected) => values_equal(actual, expected),
            FilterOp::Ne(expected) => !values_equal(actual, expected),
            FilterOp::Gt(bound) => compare(actual, bound) == Some(Ordering::Greater),
            FilterOp::Gte(bound) => matches!(compare(actual, bound), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt(bound) => compare(actual, bound) == Some(Ordering::Less),
            FilterOp::Lte(bound) => matches!(compare(actual, bound), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Between(low, high) => {
                matches!(compare(actual, low), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(actual, high), Some(Ordering::Less | Ordering::Equal))
            }
            FilterOp::StartsWith(prefix) => actual.as_str().map_or(false, |s| s.starts_with(prefix.as_str())),
            FilterOp::EndsWith(suffix) => actual.as_str().map_or(false, |s| s.ends_with(suffix.as_str())),
            FilterOp::Contains(needle) => match (actual, needle) {
                (Value::Str(s), Value::Str(n)) => s.contains(n.as_str()),
                (Value::List(items), _) => items.iter().any(|item| values_equal(item, needle)),
                (Value::Map(map), Value::Str(k)) => map.contains_key(k),
                _ => false,
            },
            FilterOp::In(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
        }
    }
}

/// Ordering between a stored value and a qualifier bound
fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual, bound) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            actual.as_f64()?.partial_cmp(&bound.as_f64()?)
        }
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match compare(actual, expected) {
        Some(ordering) => ordering == Ordering::Equal,
        None => actual == expected,
    }
}
