//! In-memory store
//!
//! A thread-safe [`Store`] that simulates the parts of a cluster the
//! data-access layer observes: nodes with replicated object counts,
//! typed secondary indexes, finite scan resources and registered
//! aggregation functions. Failures can be injected per operation kind.
//!
//! Writes merge fields into an existing record, as the cluster does.
//! Scans snapshot matching records at open time and emit them in key
//! order.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::mapping::Value;

use super::errors::{ResultCode, StoreError, StoreResult};
use super::record::{KeyRecord, Record, RecordData, RecordKey};
use super::{ExistsPolicy, IndexInfo, IndexType, NativeFilter, Node, Operation, ScanStream, Store};

/// Aggregation function registered under (module, function)
pub type AggregateFn = Arc<dyn Fn(&[KeyRecord], &[Value]) -> StoreResult<Vec<Value>> + Send + Sync>;

type CollectionId = (String, String);

/// Operation kinds failures can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Put,
    Delete,
    Operate,
    Scan,
    Aggregate,
    Info,
    CreateIndex,
}

/// In-memory [`Store`] implementation
pub struct MemoryStore {
    namespaces: Vec<String>,
    nodes: Vec<Node>,
    replication_factor: usize,
    collections: RwLock<BTreeMap<CollectionId, BTreeMap<String, Record>>>,
    indexes: RwLock<Vec<IndexInfo>>,
    aggregates: RwLock<HashMap<(String, String), AggregateFn>>,
    failures: Mutex<HashMap<StoreOp, VecDeque<StoreError>>>,
    open_scans: Arc<AtomicUsize>,
    scans_opened: AtomicUsize,
    records_fetched: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Single-node store serving one namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespaces: vec![namespace.into()],
            nodes: vec![Self::node(0)],
            replication_factor: 1,
            collections: RwLock::new(BTreeMap::new()),
            indexes: RwLock::new(Vec::new()),
            aggregates: RwLock::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            open_scans: Arc::new(AtomicUsize::new(0)),
            scans_opened: AtomicUsize::new(0),
            records_fetched: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Simulates `count` nodes
    pub fn with_nodes(mut self, count: usize) -> Self {
        self.nodes = (0..count.max(1)).map(Self::node).collect();
        self
    }

    /// Sets the namespace replication factor
    pub fn with_replication_factor(mut self, factor: usize) -> Self {
        self.replication_factor = factor.max(1);
        self
    }

    /// Serves an additional namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.push(namespace.into());
        self
    }

    /// Registers an aggregation function
    pub fn register_aggregate(&self, module: &str, function: &str, f: AggregateFn) {
        write_lock(&self.aggregates).insert((module.to_string(), function.to_string()), f);
    }

    /// Makes the next call of the given kind fail with `error`.
    ///
    /// Repeated calls queue further failures.
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Stores raw field data, bypassing any entity mapping
    pub fn insert_raw(&self, key: &RecordKey, data: RecordData) {
        let mut collections = write_lock(&self.collections);
        collections
            .entry((key.namespace.clone(), key.collection.clone()))
            .or_default()
            .insert(key.id.clone(), Record::new(data));
    }

    /// Number of records in a collection
    pub fn len(&self, namespace: &str, collection: &str) -> usize {
        read_lock(&self.collections)
            .get(&(namespace.to_string(), collection.to_string()))
            .map_or(0, BTreeMap::len)
    }

    /// Scans currently holding a resource
    pub fn open_scans(&self) -> usize {
        self.open_scans.load(Ordering::SeqCst)
    }

    /// Scans opened since creation
    pub fn scans_opened(&self) -> usize {
        self.scans_opened.load(Ordering::SeqCst)
    }

    /// Records handed out by scans since creation
    pub fn records_fetched(&self) -> usize {
        self.records_fetched.load(Ordering::SeqCst)
    }

    fn node(index: usize) -> Node {
        Node {
            name: format!("BB9{:013X}", index + 1),
            address: format!("127.0.0.1:{}", 3000 + index),
        }
    }

    fn take_failure(&self, op: StoreOp) -> StoreResult<()> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        match failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_namespace(&self, namespace: &str) -> StoreResult<()> {
        if self.namespaces.iter().any(|n| n == namespace) {
            Ok(())
        } else {
            Err(StoreError::new(
                ResultCode::InvalidNamespace,
                format!("namespace '{}' not served", namespace),
            ))
        }
    }

    fn check_index(&self, namespace: &str, collection: &str, filter: &NativeFilter) -> StoreResult<()> {
        let indexes = read_lock(&self.indexes);
        let served = indexes.iter().any(|i| {
            i.namespace == namespace
                && i.collection == collection
                && i.field == filter.field()
                && i.index_type == filter.index_type()
        });
        if served {
            Ok(())
        } else {
            Err(StoreError::new(
                ResultCode::IndexNotFound,
                format!("no {:?} index on {}.{}", filter.index_type(), collection, filter.field()),
            ))
        }
    }

    fn matching(
        &self,
        namespace: &str,
        collection: &str,
        filter: Option<&NativeFilter>,
    ) -> StoreResult<Vec<KeyRecord>> {
        self.check_namespace(namespace)?;
        if let Some(f) = filter {
            self.check_index(namespace, collection, f)?;
        }
        let collections = read_lock(&self.collections);
        let records = collections
            .get(&(namespace.to_string(), collection.to_string()))
            .map(|records| {
                records
                    .iter()
                    .filter(|(_, r)| filter.map_or(true, |f| f.matches(&r.data)))
                    .map(|(id, r)| KeyRecord::new(RecordKey::new(namespace, collection, id), r.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    fn effective_replication(&self) -> usize {
        self.replication_factor.min(self.nodes.len())
    }

    /// Objects held by one node, replicas included. Each record has a
    /// master chosen by key hash plus `replication - 1` successor nodes.
    fn node_object_count(&self, node_index: usize, namespace: &str, collection: Option<&str>) -> usize {
        let node_count = self.nodes.len();
        let replication = self.effective_replication();
        let collections = read_lock(&self.collections);
        collections
            .iter()
            .filter(|((ns, coll), _)| ns == namespace && collection.map_or(true, |c| c == coll))
            .flat_map(|(_, records)| records.keys())
            .filter(|id| {
                let master = crc32fast::hash(id.as_bytes()) as usize % node_count;
                (0..replication).any(|r| (master + r) % node_count == node_index)
            })
            .count()
    }

    fn apply_op(data: &mut RecordData, op: &Operation) -> StoreResult<()> {
        match op {
            Operation::Append { field, value } | Operation::Prepend { field, value } => {
                let prepend = matches!(op, Operation::Prepend { .. });
                match data.get_mut(field) {
                    None => {
                        data.insert(field.clone(), Value::Str(value.clone()));
                    }
                    Some(Value::Str(current)) => {
                        if prepend {
                            current.insert_str(0, value);
                        } else {
                            current.push_str(value);
                        }
                    }
                    Some(other) => {
                        return Err(StoreError::new(
                            ResultCode::BinTypeError,
                            format!("cannot concatenate onto {} field '{}'", other.type_name(), field),
                        ))
                    }
                }
            }
            Operation::Add { field, delta } => match data.get_mut(field) {
                None => {
                    data.insert(field.clone(), Value::Int(*delta));
                }
                Some(Value::Int(current)) => {
                    *current = current.checked_add(*delta).ok_or_else(|| {
                        StoreError::new(ResultCode::ParameterError, format!("overflow adding to '{}'", field))
                    })?;
                }
                Some(other) => {
                    return Err(StoreError::new(
                        ResultCode::BinTypeError,
                        format!("cannot add to {} field '{}'", other.type_name(), field),
                    ))
                }
            },
            Operation::Get => {}
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &RecordKey) -> StoreResult<Option<Record>> {
        self.take_failure(StoreOp::Get)?;
        self.check_namespace(&key.namespace)?;
        let collections = read_lock(&self.collections);
        Ok(collections
            .get(&(key.namespace.clone(), key.collection.clone()))
            .and_then(|records| records.get(&key.id))
            .cloned())
    }

    fn put(&self, key: &RecordKey, data: &RecordData, policy: ExistsPolicy) -> StoreResult<()> {
        self.take_failure(StoreOp::Put)?;
        self.check_namespace(&key.namespace)?;
        let mut collections = write_lock(&self.collections);
        let records = collections
            .entry((key.namespace.clone(), key.collection.clone()))
            .or_default();

        match (records.get_mut(&key.id), policy) {
            (Some(_), ExistsPolicy::CreateOnly) => Err(StoreError::new(
                ResultCode::KeyExists,
                format!("record {} already exists", key),
            )),
            (None, ExistsPolicy::UpdateOnly) => Err(StoreError::new(
                ResultCode::KeyNotFound,
                format!("record {} not found", key),
            )),
            (Some(existing), _) => {
                for (field, value) in data {
                    existing.data.insert(field.clone(), value.clone());
                }
                existing.generation += 1;
                Ok(())
            }
            (None, _) => {
                records.insert(key.id.clone(), Record::new(data.clone()));
                Ok(())
            }
        }
    }

    fn delete(&self, key: &RecordKey) -> StoreResult<bool> {
        self.take_failure(StoreOp::Delete)?;
        self.check_namespace(&key.namespace)?;
        let mut collections = write_lock(&self.collections);
        Ok(collections
            .get_mut(&(key.namespace.clone(), key.collection.clone()))
            .and_then(|records| records.remove(&key.id))
            .is_some())
    }

    fn operate(&self, key: &RecordKey, ops: &[Operation]) -> StoreResult<Record> {
        self.take_failure(StoreOp::Operate)?;
        self.check_namespace(&key.namespace)?;
        let mut collections = write_lock(&self.collections);
        let records = collections
            .entry((key.namespace.clone(), key.collection.clone()))
            .or_default();

        let writes = ops.iter().any(|op| !matches!(op, Operation::Get));
        let mut record = match records.get(&key.id) {
            Some(r) => r.clone(),
            None if writes => Record {
                data: RecordData::new(),
                generation: 0,
            },
            None => {
                return Err(StoreError::new(
                    ResultCode::KeyNotFound,
                    format!("record {} not found", key),
                ))
            }
        };

        for op in ops {
            Self::apply_op(&mut record.data, op)?;
        }
        if writes {
            record.generation += 1;
            records.insert(key.id.clone(), record.clone());
        }
        Ok(record)
    }

    fn scan(
        &self,
        namespace: &str,
        collection: &str,
        filter: Option<&NativeFilter>,
    ) -> StoreResult<Box<dyn ScanStream>> {
        self.take_failure(StoreOp::Scan)?;
        let records = self.matching(namespace, collection, filter)?;
        self.open_scans.fetch_add(1, Ordering::SeqCst);
        self.scans_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryScan {
            records: records.into(),
            open_scans: Arc::clone(&self.open_scans),
            records_fetched: Arc::clone(&self.records_fetched),
            closed: false,
        }))
    }

    fn aggregate(
        &self,
        namespace: &str,
        collection: &str,
        filter: Option<&NativeFilter>,
        module: &str,
        function: &str,
        args: &[Value],
    ) -> StoreResult<Vec<Value>> {
        self.take_failure(StoreOp::Aggregate)?;
        let f = read_lock(&self.aggregates)
            .get(&(module.to_string(), function.to_string()))
            .cloned()
            .ok_or_else(|| {
                StoreError::new(
                    ResultCode::UdfNotFound,
                    format!("aggregation {}.{} not registered", module, function),
                )
            })?;
        let records = self.matching(namespace, collection, filter)?;
        f(&records, args)
    }

    fn node_list(&self) -> StoreResult<Vec<Node>> {
        Ok(self.nodes.clone())
    }

    fn info_request(&self, node: &Node, query: &str) -> StoreResult<String> {
        self.take_failure(StoreOp::Info)?;
        let node_index = self
            .nodes
            .iter()
            .position(|n| n == node)
            .ok_or_else(|| StoreError::new(ResultCode::Connection, format!("unknown node {}", node.name)))?;

        let parts: Vec<&str> = query.split('/').collect();
        match parts.as_slice() {
            ["sets", namespace, collection] => {
                self.check_namespace(namespace)?;
                let objects = self.node_object_count(node_index, namespace, Some(collection));
                Ok(format!(
                    "objects={}:tombstones=0:memory_data_bytes=0:truncate_lut=0:disable-eviction=false;",
                    objects
                ))
            }
            ["namespace", namespace] => {
                self.check_namespace(namespace)?;
                let objects = self.node_object_count(node_index, namespace, None);
                Ok(format!(
                    "objects={};replication-factor={};memory-size=1073741824;storage-engine=memory",
                    objects, self.replication_factor
                ))
            }
            _ => Ok(String::new()),
        }
    }

    fn create_index(
        &self,
        namespace: &str,
        collection: &str,
        index_name: &str,
        field: &str,
        index_type: IndexType,
    ) -> StoreResult<()> {
        self.take_failure(StoreOp::CreateIndex)?;
        self.check_namespace(namespace)?;
        let mut indexes = write_lock(&self.indexes);
        if indexes
            .iter()
            .any(|i| i.namespace == namespace && i.name == index_name)
        {
            return Err(StoreError::new(
                ResultCode::IndexAlreadyExists,
                format!("index '{}' already exists", index_name),
            ));
        }
        indexes.push(IndexInfo {
            name: index_name.to_string(),
            namespace: namespace.to_string(),
            collection: collection.to_string(),
            field: field.to_string(),
            index_type,
        });
        Ok(())
    }

    fn indexes(&self, namespace: &str, collection: &str) -> StoreResult<Vec<IndexInfo>> {
        self.check_namespace(namespace)?;
        Ok(read_lock(&self.indexes)
            .iter()
            .filter(|i| i.namespace == namespace && i.collection == collection)
            .cloned()
            .collect())
    }
}

/// Scan over a snapshot of matching records
struct MemoryScan {
    records: VecDeque<KeyRecord>,
    open_scans: Arc<AtomicUsize>,
    records_fetched: Arc<AtomicUsize>,
    closed: bool,
}

impl ScanStream for MemoryScan {
    fn next_record(&mut self) -> Option<StoreResult<KeyRecord>> {
        if self.closed {
            return None;
        }
        let next = self.records.pop_front()?;
        self.records_fetched.fetch_add(1, Ordering::SeqCst);
        Some(Ok(next))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.records.clear();
            self.open_scans.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemoryScan {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> RecordKey {
        RecordKey::new("test", "Person", id)
    }

    fn data(pairs: &[(&str, Value)]) -> RecordData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn drain(scan: &mut Box<dyn ScanStream>) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(r) = scan.next_record() {
            ids.push(r.unwrap().key.id);
        }
        ids
    }

    #[test]
    fn test_put_policies() {
        let store = MemoryStore::new("test");
        let d = data(&[("name", Value::from("Ann"))]);

        let err = store.put(&key("1"), &d, ExistsPolicy::UpdateOnly).unwrap_err();
        assert_eq!(err.code(), ResultCode::KeyNotFound);

        store.put(&key("1"), &d, ExistsPolicy::CreateOnly).unwrap();
        let err = store.put(&key("1"), &d, ExistsPolicy::CreateOnly).unwrap_err();
        assert_eq!(err.code(), ResultCode::KeyExists);

        store.put(&key("1"), &d, ExistsPolicy::UpdateOnly).unwrap();
        store.put(&key("1"), &d, ExistsPolicy::Upsert).unwrap();
        assert_eq!(store.get(&key("1")).unwrap().unwrap().generation, 3);
    }

    #[test]
    fn test_put_merges_fields() {
        let store = MemoryStore::new("test");
        store
            .put(&key("1"), &data(&[("a", Value::from(1))]), ExistsPolicy::Upsert)
            .unwrap();
        store
            .put(&key("1"), &data(&[("b", Value::from(2))]), ExistsPolicy::Upsert)
            .unwrap();
        let record = store.get(&key("1")).unwrap().unwrap();
        assert_eq!(record.data.len(), 2);
    }

    #[test]
    fn test_unknown_namespace_rejected() {
        let store = MemoryStore::new("test");
        let err = store
            .get(&RecordKey::new("other", "Person", "1"))
            .unwrap_err();
        assert_eq!(err.code(), ResultCode::InvalidNamespace);
    }

    #[test]
    fn test_scan_accounting() {
        let store = MemoryStore::new("test");
        for id in ["1", "2", "3"] {
            store.insert_raw(&key(id), RecordData::new());
        }

        let mut scan = store.scan("test", "Person", None).unwrap();
        assert_eq!(store.open_scans(), 1);
        assert_eq!(drain(&mut scan), vec!["1", "2", "3"]);
        assert_eq!(store.records_fetched(), 3);

        scan.close();
        scan.close();
        assert_eq!(store.open_scans(), 0);
    }

    #[test]
    fn test_dropped_scan_released() {
        let store = MemoryStore::new("test");
        {
            let _scan = store.scan("test", "Person", None).unwrap();
            assert_eq!(store.open_scans(), 1);
        }
        assert_eq!(store.open_scans(), 0);
    }

    #[test]
    fn test_filtered_scan_requires_index() {
        let store = MemoryStore::new("test");
        let filter = NativeFilter::range("age", 31, i64::MAX);
        let err = store.scan("test", "Person", Some(&filter)).err().unwrap();
        assert_eq!(err.code(), ResultCode::IndexNotFound);
        assert_eq!(store.open_scans(), 0);

        store
            .create_index("test", "Person", "age_idx", "age", IndexType::Numeric)
            .unwrap();
        store.insert_raw(&key("1"), data(&[("age", Value::from(25))]));
        store.insert_raw(&key("2"), data(&[("age", Value::from(40))]));

        let mut scan = store.scan("test", "Person", Some(&filter)).unwrap();
        assert_eq!(drain(&mut scan), vec!["2"]);
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let store = MemoryStore::new("test");
        store
            .create_index("test", "Person", "idx", "age", IndexType::Numeric)
            .unwrap();
        let err = store
            .create_index("test", "Person", "idx", "name", IndexType::String)
            .unwrap_err();
        assert_eq!(err.code(), ResultCode::IndexAlreadyExists);
        assert_eq!(store.indexes("test", "Person").unwrap().len(), 1);
    }

    #[test]
    fn test_operate_concatenates_and_adds() {
        let store = MemoryStore::new("test");
        store.insert_raw(&key("1"), data(&[("name", Value::from("b")), ("n", Value::from(1))]));

        let record = store
            .operate(
                &key("1"),
                &[
                    Operation::Prepend {
                        field: "name".into(),
                        value: "a".into(),
                    },
                    Operation::Append {
                        field: "name".into(),
                        value: "c".into(),
                    },
                    Operation::Add {
                        field: "n".into(),
                        delta: 4,
                    },
                    Operation::Get,
                ],
            )
            .unwrap();
        assert_eq!(record.get("name"), Some(&Value::from("abc")));
        assert_eq!(record.get("n"), Some(&Value::from(5)));
    }

    #[test]
    fn test_operate_type_error() {
        let store = MemoryStore::new("test");
        store.insert_raw(&key("1"), data(&[("n", Value::from(1))]));
        let err = store
            .operate(
                &key("1"),
                &[Operation::Append {
                    field: "n".into(),
                    value: "x".into(),
                }],
            )
            .unwrap_err();
        assert_eq!(err.code(), ResultCode::BinTypeError);
    }

    #[test]
    fn test_read_only_operate_on_missing_record() {
        let store = MemoryStore::new("test");
        let err = store.operate(&key("nope"), &[Operation::Get]).unwrap_err();
        assert_eq!(err.code(), ResultCode::KeyNotFound);
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let store = MemoryStore::new("test");
        store.fail_next(StoreOp::Get, StoreError::new(ResultCode::Timeout, "slow"));
        assert!(store.get(&key("1")).is_err());
        assert!(store.get(&key("1")).is_ok());
    }

    #[test]
    fn test_node_counts_include_replicas() {
        let store = MemoryStore::new("test")
            .with_nodes(3)
            .with_replication_factor(2);
        for i in 0..10 {
            store.insert_raw(&key(&i.to_string()), RecordData::new());
        }

        let total: usize = store
            .node_list()
            .unwrap()
            .iter()
            .map(|node| {
                let info = store.info_request(node, "sets/test/Person").unwrap();
                let objects = info
                    .split(':')
                    .next()
                    .and_then(|kv| kv.strip_prefix("objects="))
                    .unwrap();
                objects.parse::<usize>().unwrap()
            })
            .sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn test_namespace_info_reports_replication() {
        let store = MemoryStore::new("test").with_nodes(2).with_replication_factor(2);
        let node = store.node_list().unwrap().remove(0);
        let info = store.info_request(&node, "namespace/test").unwrap();
        assert!(info.contains("replication-factor=2"));
    }

    #[test]
    fn test_aggregate_runs_registered_function() {
        let store = MemoryStore::new("test");
        store.insert_raw(&key("1"), data(&[("n", Value::from(2))]));
        store.insert_raw(&key("2"), data(&[("n", Value::from(5))]));
        store.register_aggregate(
            "stats",
            "sum",
            Arc::new(|records, _args| {
                let sum = records
                    .iter()
                    .filter_map(|r| r.record.get("n").and_then(Value::as_int))
                    .sum::<i64>();
                Ok(vec![Value::from(sum)])
            }),
        );

        let out = store
            .aggregate("test", "Person", None, "stats", "sum", &[])
            .unwrap();
        assert_eq!(out, vec![Value::from(7)]);

        let err = store
            .aggregate("test", "Person", None, "stats", "avg", &[])
            .unwrap_err();
        assert_eq!(err.code(), ResultCode::UdfNotFound);
    }
}
