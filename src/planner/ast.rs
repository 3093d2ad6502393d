//! Query structures
//!
//! A query is an ordered conjunction of qualifiers plus an optional sort.
//! Qualifiers are immutable once built.

use std::fmt;

use crate::mapping::Value;

/// Comparison applied by a qualifier
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// field = value
    Eq(Value),
    /// field != value (field must be present)
    Ne(Value),
    /// field > value
    Gt(Value),
    /// field >= value
    Gte(Value),
    /// field < value
    Lt(Value),
    /// field <= value
    Lte(Value),
    /// low <= field <= high
    Between(Value, Value),
    /// String field starts with the prefix
    StartsWith(String),
    /// String field ends with the suffix
    EndsWith(String),
    /// Substring of a string field, or element of a list field
    Contains(Value),
    /// field equals one of the values
    In(Vec<Value>),
}

impl FilterOp {
    /// Returns true if this is an equality operation
    pub fn is_equality(&self) -> bool {
        matches!(self, FilterOp::Eq(_))
    }

    /// Returns true if this is a range operation
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            FilterOp::Gt(_) | FilterOp::Gte(_) | FilterOp::Lt(_) | FilterOp::Lte(_) | FilterOp::Between(_, _)
        )
    }

    /// Returns the operation name for explain output
    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "eq",
            FilterOp::Ne(_) => "ne",
            FilterOp::Gt(_) => "gt",
            FilterOp::Gte(_) => "gte",
            FilterOp::Lt(_) => "lt",
            FilterOp::Lte(_) => "lte",
            FilterOp::Between(_, _) => "between",
            FilterOp::StartsWith(_) => "starts_with",
            FilterOp::EndsWith(_) => "ends_with",
            FilterOp::Contains(_) => "contains",
            FilterOp::In(_) => "in",
        }
    }
}

/// A single condition on one field
#[derive(Debug, Clone, PartialEq)]
pub struct Qualifier {
    /// Field name
    pub field: String,
    /// Filter operation
    pub op: FilterOp,
}

impl Qualifier {
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq(value.into()))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Ne(value.into()))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte(value.into()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lt(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lte(value.into()))
    }

    pub fn between(field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Between(low.into(), high.into()))
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(field, FilterOp::StartsWith(prefix.into()))
    }

    pub fn ends_with(field: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::new(field, FilterOp::EndsWith(suffix.into()))
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Contains(value.into()))
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOp::In(values))
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            FilterOp::Eq(v)
            | FilterOp::Ne(v)
            | FilterOp::Gt(v)
            | FilterOp::Gte(v)
            | FilterOp::Lt(v)
            | FilterOp::Lte(v)
            | FilterOp::Contains(v) => write!(f, "{} {} {}", self.field, self.op.op_name(), v),
            FilterOp::Between(low, high) => write!(f, "{} between {} and {}", self.field, low, high),
            FilterOp::StartsWith(s) | FilterOp::EndsWith(s) => {
                write!(f, "{} {} {:?}", self.field, self.op.op_name(), s)
            }
            FilterOp::In(values) => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} in [{}]", self.field, rendered.join(", "))
            }
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One (field, direction) pair of a sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: SortDirection,
    /// Compare string values case-insensitively
    pub ignore_case: bool,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
            ignore_case: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
            ignore_case: false,
        }
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str())?;
        if self.ignore_case {
            write!(f, " (ignore case)")?;
        }
        Ok(())
    }
}

/// Ordered list of sort pairs; the first pair is the primary key
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sort {
    pub orders: Vec<Order>,
}

impl Sort {
    pub fn by(order: Order) -> Self {
        Self { orders: vec![order] }
    }

    pub fn then(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.orders.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(", "))
    }
}

/// Conjunctive query over one collection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Qualifiers, all combined with AND, in caller order
    pub qualifiers: Vec<Qualifier>,
    /// Optional sort
    pub sort: Option<Sort>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a qualifier
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    /// Adds an equality qualifier
    pub fn filter_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_qualifier(Qualifier::eq(field, value))
    }

    /// Sets the sort
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Returns true if a non-empty sort was requested
    pub fn is_sorted(&self) -> bool {
        self.sort.as_ref().map_or(false, |s| !s.is_unsorted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .with_qualifier(Qualifier::gt("age", 30))
            .filter_eq("city", "NYC")
            .with_sort(Sort::by(Order::asc("name")));

        assert_eq!(query.qualifiers.len(), 2);
        assert_eq!(query.qualifiers[1].field, "city");
        assert!(query.is_sorted());
    }

    #[test]
    fn test_operation_kinds() {
        assert!(Qualifier::eq("a", 1).op.is_equality());
        assert!(Qualifier::between("a", 1, 2).op.is_range());
        assert!(!Qualifier::starts_with("a", "x").op.is_range());
    }

    #[test]
    fn test_empty_sort_is_unsorted() {
        let query = Query::new().with_sort(Sort::default());
        assert!(!query.is_sorted());
    }

    #[test]
    fn test_display() {
        assert_eq!(Qualifier::gt("age", 30).to_string(), "age gt 30");
        let sort = Sort::by(Order::desc("age")).then(Order::asc("name").ignoring_case());
        assert_eq!(sort.to_string(), "age desc, name asc (ignore case)");
    }
}
