//! Keys and records exchanged with the store

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mapping::Value;

/// Field name to value mapping of one record
pub type RecordData = BTreeMap<String, Value>;

/// (namespace, collection, identifier) triple addressing one record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub namespace: String,
    pub collection: String,
    pub id: String,
}

impl RecordKey {
    pub fn new(
        namespace: impl Into<String>,
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.collection, self.id)
    }
}

/// A stored record: its fields plus the store's write generation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: RecordData,
    pub generation: u32,
}

impl Record {
    pub fn new(data: RecordData) -> Self {
        Self {
            data,
            generation: 1,
        }
    }

    /// Field value by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// A record together with the key it was read under, as produced by scans
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub key: RecordKey,
    pub record: Record,
}

impl KeyRecord {
    pub fn new(key: RecordKey, record: Record) -> Self {
        Self { key, record }
    }
}
