//! Query planner
//!
//! Splits a query into at most one store-native filter and a list of
//! residual qualifiers evaluated client-side.
//!
//! Promotion rule (strict):
//! 1. Walk qualifiers in caller order
//! 2. The first one the store can serve natively is promoted
//! 3. Every other qualifier is residual, promotable or not
//!
//! This is first-wins, not selectivity-based. A later qualifier that would
//! narrow the scan more is still evaluated client-side.
//!
//! A qualifier is servable only when its field carries a matching index and
//! the field's declared type is the one the store filter compares: integer
//! for ranges and integer equality, string for string equality. The
//! identifier lives in the record key, never in the stored fields, so it is
//! never promoted.

use std::collections::{HashMap, HashSet};

use crate::mapping::{Entity, FieldType, Value};
use crate::store::{IndexInfo, IndexType, NativeFilter};

use super::ast::{FilterOp, Qualifier, Query, Sort};

/// Secondary indexes and declared field types for one collection
#[derive(Debug, Clone, Default)]
pub struct IndexMetadata {
    indexed_fields: HashMap<String, HashSet<IndexType>>,
    declared_types: HashMap<String, FieldType>,
}

impl IndexMetadata {
    /// Creates empty index metadata (nothing is promotable)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds metadata from index definitions reported by the store
    pub fn from_indexes<'a>(indexes: impl IntoIterator<Item = &'a IndexInfo>) -> Self {
        let mut meta = Self::new();
        for index in indexes {
            meta.add(index.field.clone(), index.index_type);
        }
        meta
    }

    /// Builds metadata for entity `E` from the store's index definitions.
    ///
    /// Only data fields are declared; the identifier stays undeclared.
    pub fn for_entity<'a, E: Entity>(indexes: impl IntoIterator<Item = &'a IndexInfo>) -> Self {
        let mut meta = Self::from_indexes(indexes);
        for field in E::descriptor().fields() {
            meta.declare(field.name(), field.field_type());
        }
        meta
    }

    /// Records the declared type of a stored field
    pub fn declare(&mut self, field: impl Into<String>, field_type: FieldType) {
        self.declared_types.insert(field.into(), field_type);
    }

    pub fn declared_type(&self, field: &str) -> Option<FieldType> {
        self.declared_types.get(field).copied()
    }

    /// Registers an index on `field`
    pub fn add(&mut self, field: impl Into<String>, index_type: IndexType) {
        self.indexed_fields
            .entry(field.into())
            .or_default()
            .insert(index_type);
    }

    /// Checks if `field` carries an index of the given type
    pub fn supports(&self, field: &str, index_type: IndexType) -> bool {
        self.indexed_fields
            .get(field)
            .map_or(false, |types| types.contains(&index_type))
    }
}

/// Outcome of planning one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Filter pushed to the store, if any qualifier was promotable
    pub native_filter: Option<NativeFilter>,
    /// The qualifier the native filter was derived from
    pub promoted: Option<Qualifier>,
    /// Qualifiers evaluated client-side, in caller order
    pub residual: Vec<Qualifier>,
    /// Requested sort, applied after materialization
    pub sort: Option<Sort>,
}

impl QueryPlan {
    /// Plan for an unfiltered scan
    pub fn full_scan(sort: Option<Sort>) -> Self {
        Self {
            native_filter: None,
            promoted: None,
            residual: Vec::new(),
            sort,
        }
    }
}

/// Query planner over one collection's index metadata
pub struct QueryPlanner<'a> {
    index_metadata: &'a IndexMetadata,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(index_metadata: &'a IndexMetadata) -> Self {
        Self { index_metadata }
    }

    /// Plans a query. Deterministic: same inputs give the same plan.
    pub fn plan(&self, query: &Query) -> QueryPlan {
        let mut native_filter = None;
        let mut promoted = None;
        let mut residual = Vec::with_capacity(query.qualifiers.len());

        for qualifier in &query.qualifiers {
            if native_filter.is_none() {
                if let Some(filter) = self.native_filter(qualifier) {
                    native_filter = Some(filter);
                    promoted = Some(qualifier.clone());
                    continue;
                }
            }
            residual.push(qualifier.clone());
        }

        QueryPlan {
            native_filter,
            promoted,
            residual,
            sort: query.sort.clone(),
        }
    }

    /// Native form of a qualifier, if the store can serve it.
    ///
    /// Requires an equality on a string or integer value, or an integer
    /// range, on a field declared with that type and indexed with the
    /// matching index type.
    pub fn native_filter(&self, qualifier: &Qualifier) -> Option<NativeFilter> {
        let filter = Self::representable(qualifier)?;
        let declared = self.index_metadata.declared_type(filter.field())?;
        if declared == Self::compared_type(&filter)
            && self
                .index_metadata
                .supports(filter.field(), filter.index_type())
        {
            Some(filter)
        } else {
            None
        }
    }

    /// Stored type the store compares when serving `filter`
    fn compared_type(filter: &NativeFilter) -> FieldType {
        match filter {
            NativeFilter::Equal {
                value: Value::Str(_),
                ..
            } => FieldType::Str,
            _ => FieldType::Int,
        }
    }

    fn representable(qualifier: &Qualifier) -> Option<NativeFilter> {
        let field = qualifier.field.as_str();
        match &qualifier.op {
            FilterOp::Eq(value @ (Value::Str(_) | Value::Int(_))) => {
                Some(NativeFilter::equal(field, value.clone()))
            }
            FilterOp::Gt(Value::Int(v)) => Some(NativeFilter::range(field, v.checked_add(1)?, i64::MAX)),
            FilterOp::Gte(Value::Int(v)) => Some(NativeFilter::range(field, *v, i64::MAX)),
            FilterOp::Lt(Value::Int(v)) => Some(NativeFilter::range(field, i64::MIN, v.checked_sub(1)?)),
            FilterOp::Lte(Value::Int(v)) => Some(NativeFilter::range(field, i64::MIN, *v)),
            FilterOp::Between(Value::Int(low), Value::Int(high)) if low <= high => {
                Some(NativeFilter::range(field, *low, *high))
            }
            _ => None,
        }
    }
}
