//! Typed field values
//!
//! The store understands six value kinds. Entities convert their fields into
//! these through the descriptor table.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{MappingError, MappingResult};

/// A single typed value stored in a record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Blob(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the value kind name used in error messages
    pub fn type_name(&self) -> &'static str {
        self.field_type().as_str()
    }

    /// Returns the field type this value belongs to
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Str(_) => FieldType::Str,
            Value::Int(_) => FieldType::Int,
            Value::Float(_) => FieldType::Float,
            Value::Blob(_) => FieldType::Blob,
            Value::List(_) => FieldType::List,
            Value::Map(_) => FieldType::Map,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of integer and float values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn into_string(self) -> MappingResult<String> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(MappingError::conversion("string", other.type_name())),
        }
    }

    pub fn into_int(self) -> MappingResult<i64> {
        match self {
            Value::Int(i) => Ok(i),
            other => Err(MappingError::conversion("integer", other.type_name())),
        }
    }

    /// Integers widen to floats; everything else is a mismatch
    pub fn into_float(self) -> MappingResult<f64> {
        match self {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(MappingError::conversion("float", other.type_name())),
        }
    }

    pub fn into_blob(self) -> MappingResult<Vec<u8>> {
        match self {
            Value::Blob(b) => Ok(b),
            other => Err(MappingError::conversion("blob", other.type_name())),
        }
    }

    pub fn into_list(self) -> MappingResult<Vec<Value>> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(MappingError::conversion("list", other.type_name())),
        }
    }

    pub fn into_map(self) -> MappingResult<BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Ok(m),
            other => Err(MappingError::conversion("map", other.type_name())),
        }
    }

    /// Converts a list of strings, failing on the first non-string element
    pub fn into_string_list(self) -> MappingResult<Vec<String>> {
        self.into_list()?
            .into_iter()
            .map(Value::into_string)
            .collect()
    }

    /// Natural ordering between two values of the same kind.
    ///
    /// Returns `None` for values of different kinds and for maps, which have
    /// no natural ordering. Lists compare element by element.
    pub fn natural_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Some(a.total_cmp(b)),
            (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.natural_cmp(y)? {
                        Ordering::Equal => continue,
                        non_eq => return Some(non_eq),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Stringified form used for record identifiers
    pub(crate) fn to_key_string(&self) -> Option<String> {
        match self {
            Value::Str(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<Vec<String>> for Value {
    fn from(l: Vec<String>) -> Self {
        Value::List(l.into_iter().map(Value::Str).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

/// Declared type of an entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Str,
    Int,
    Float,
    Blob,
    List,
    Map,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Str => "string",
            FieldType::Int => "integer",
            FieldType::Float => "float",
            FieldType::Blob => "blob",
            FieldType::List => "list",
            FieldType::Map => "map",
        }
    }

    /// Coerces a stored value into this type.
    ///
    /// Exact matches pass through, integers widen to floats, anything else
    /// is a mismatch.
    pub fn coerce(&self, field: &str, value: Value) -> MappingResult<Value> {
        match (self, value) {
            (FieldType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (expected, value) if value.field_type() == *expected => Ok(value),
            (expected, value) => Err(MappingError::type_mismatch(
                field,
                expected.as_str(),
                value.type_name(),
            )),
        }
    }

    /// Whether values of this type have a natural ordering
    pub fn is_orderable(&self) -> bool {
        !matches!(self, FieldType::Map)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_widens_to_float() {
        let v = FieldType::Float.coerce("score", Value::Int(3)).unwrap();
        assert_eq!(v, Value::Float(3.0));
    }

    #[test]
    fn test_float_does_not_narrow_to_int() {
        let err = FieldType::Int.coerce("age", Value::Float(3.5)).unwrap_err();
        assert_eq!(err.field(), Some("age"));
    }

    #[test]
    fn test_string_is_not_a_blob() {
        assert!(FieldType::Blob.coerce("data", Value::from("abc")).is_err());
    }

    #[test]
    fn test_natural_cmp_same_kind() {
        assert_eq!(
            Value::from(1).natural_cmp(&Value::from(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("b").natural_cmp(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::from(vec![Value::from(1), Value::from(2)])
                .natural_cmp(&Value::from(vec![Value::from(1)])),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_natural_cmp_rejects_mixed_kinds() {
        assert_eq!(Value::from(1).natural_cmp(&Value::from("1")), None);
        assert_eq!(
            Value::Map(BTreeMap::new()).natural_cmp(&Value::Map(BTreeMap::new())),
            None
        );
    }

    #[test]
    fn test_key_string() {
        assert_eq!(Value::from(42).to_key_string(), Some("42".to_string()));
        assert_eq!(Value::from("abc").to_key_string(), Some("abc".to_string()));
        assert_eq!(Value::from(1.5).to_key_string(), None);
    }

    #[test]
    fn test_string_list() {
        let v = Value::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(v.into_string_list().unwrap(), vec!["a", "b"]);
    }
}
