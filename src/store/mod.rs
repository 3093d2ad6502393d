//! Store client boundary
//!
//! The clustered key-value store is an external collaborator. This module
//! defines the interface the data-access layer consumes from it, plus
//! [`MemoryStore`], a self-contained implementation used for embedding and
//! tests.
//!
//! # Contract
//!
//! - Implementations are internally thread-safe (`Send + Sync`)
//! - A scan holds a finite per-node resource until `ScanStream::close`
//! - At most one native filter per scan, backed by a secondary index

mod errors;
mod memory;
mod record;

pub use errors::{ResultCode, StoreError, StoreResult};
pub use memory::{AggregateFn, MemoryStore, StoreOp};
pub use record::{KeyRecord, Record, RecordData, RecordKey};

use serde::{Deserialize, Serialize};

use crate::mapping::Value;

/// Existence constraint applied to a put
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsPolicy {
    /// Fail with `KeyExists` if the record is present
    CreateOnly,
    /// Fail with `KeyNotFound` if the record is absent
    UpdateOnly,
    /// No constraint
    Upsert,
}

impl ExistsPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExistsPolicy::CreateOnly => "create_only",
            ExistsPolicy::UpdateOnly => "update_only",
            ExistsPolicy::Upsert => "upsert",
        }
    }
}

/// Secondary index kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Numeric,
    String,
}

/// Secondary index definition as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub namespace: String,
    pub collection: String,
    pub field: String,
    pub index_type: IndexType,
}

/// Predicate the store evaluates itself through a secondary index
#[derive(Debug, Clone, PartialEq)]
pub enum NativeFilter {
    /// Equality on a string or integer value
    Equal { field: String, value: Value },
    /// Inclusive integer range
    Range { field: String, begin: i64, end: i64 },
}

impl NativeFilter {
    pub fn equal(field: impl Into<String>, value: Value) -> Self {
        NativeFilter::Equal {
            field: field.into(),
            value,
        }
    }

    pub fn range(field: impl Into<String>, begin: i64, end: i64) -> Self {
        NativeFilter::Range {
            field: field.into(),
            begin,
            end,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            NativeFilter::Equal { field, .. } | NativeFilter::Range { field, .. } => field,
        }
    }

    /// Index kind required to serve this filter
    pub fn index_type(&self) -> IndexType {
        match self {
            NativeFilter::Equal {
                value: Value::Str(_),
                ..
            } => IndexType::String,
            _ => IndexType::Numeric,
        }
    }

    /// Evaluates the filter against record data
    pub fn matches(&self, data: &RecordData) -> bool {
        match self {
            NativeFilter::Equal { field, value } => data.get(field) == Some(value),
            NativeFilter::Range { field, begin, end } => match data.get(field) {
                Some(Value::Int(v)) => v >= begin && v <= end,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for NativeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeFilter::Equal { field, value } => write!(f, "{} = {}", field, value),
            NativeFilter::Range { field, begin, end } => {
                write!(f, "{} in [{}, {}]", field, begin, end)
            }
        }
    }
}

/// Single-record atomic operation
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Append to a string field
    Append { field: String, value: String },
    /// Prepend to a string field
    Prepend { field: String, value: String },
    /// Add to an integer field
    Add { field: String, delta: i64 },
    /// Read every field after the preceding operations
    Get,
}

/// Cluster node handle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub name: String,
    pub address: String,
}

/// Stream of raw records produced by a scan.
///
/// `next_record` returns `None` once the scan is drained. `close` releases
/// the scan resource synchronously and must be idempotent.
pub trait ScanStream: Send {
    fn next_record(&mut self) -> Option<StoreResult<KeyRecord>>;
    fn close(&mut self);
}

/// The wire client of the clustered key-value store
pub trait Store: Send + Sync {
    /// Reads one record, `None` if absent
    fn get(&self, key: &RecordKey) -> StoreResult<Option<Record>>;

    /// Writes the given fields under the existence policy
    fn put(&self, key: &RecordKey, data: &RecordData, policy: ExistsPolicy) -> StoreResult<()>;

    /// Deletes one record, returning whether it existed
    fn delete(&self, key: &RecordKey) -> StoreResult<bool>;

    /// Applies atomic operations to one record and returns the result
    fn operate(&self, key: &RecordKey, ops: &[Operation]) -> StoreResult<Record>;

    /// Opens a scan over a collection, optionally narrowed by a native filter
    fn scan(
        &self,
        namespace: &str,
        collection: &str,
        filter: Option<&NativeFilter>,
    ) -> StoreResult<Box<dyn ScanStream>>;

    /// Runs a registered aggregation over a collection
    fn aggregate(
        &self,
        namespace: &str,
        collection: &str,
        filter: Option<&NativeFilter>,
        module: &str,
        function: &str,
        args: &[Value],
    ) -> StoreResult<Vec<Value>>;

    /// Nodes currently in the cluster
    fn node_list(&self) -> StoreResult<Vec<Node>>;

    /// Raw info request against one node
    fn info_request(&self, node: &Node, query: &str) -> StoreResult<String>;

    /// Creates a secondary index
    fn create_index(
        &self,
        namespace: &str,
        collection: &str,
        index_name: &str,
        field: &str,
        index_type: IndexType,
    ) -> StoreResult<()>;

    /// Secondary indexes defined on a collection
    fn indexes(&self, namespace: &str, collection: &str) -> StoreResult<Vec<IndexInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, Value)]) -> RecordData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_equal_filter() {
        let f = NativeFilter::equal("city", Value::from("NYC"));
        assert!(f.matches(&data(&[("city", Value::from("NYC"))])));
        assert!(!f.matches(&data(&[("city", Value::from("LA"))])));
        assert!(!f.matches(&data(&[])));
        assert_eq!(f.index_type(), IndexType::String);
    }

    #[test]
    fn test_range_filter_inclusive() {
        let f = NativeFilter::range("age", 31, i64::MAX);
        assert!(!f.matches(&data(&[("age", Value::from(30))])));
        assert!(f.matches(&data(&[("age", Value::from(31))])));
        assert!(!f.matches(&data(&[("age", Value::from(31.0))])));
        assert_eq!(f.index_type(), IndexType::Numeric);
    }
}
