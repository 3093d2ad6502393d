//! The data-access facade
//!
//! Composes the record codec, planner, cursors, windows, sorter and error
//! translator into the public operations. Every store call goes through
//! the translator; every cursor opened here is closed before returning.

use std::sync::Arc;

use crate::executor::{
    Cursor, CursorContext, LazyCursor, RangeWindow, ResidualFilter, ResultSorter,
};
use crate::mapping::{Entity, RecordCodec, Value};
use crate::observability::{Event, JsonLogger, LogSink};
use crate::planner::{ExplainPlan, IndexMetadata, Qualifier, Query, QueryPlan, QueryPlanner, Sort};
use crate::store::{
    ExistsPolicy, IndexType, RecordData, RecordKey, ScanStream, Store, StoreError, StoreResult,
};
use crate::translate::{
    translate_or_wrap, AccessResult, DataAccessError, DefaultErrorTranslator, ErrorTranslator,
};

use super::config::{ConfigResult, FacadeConfig};
use super::report::{BatchReport, DeleteReport, Page, PageRequest};

/// Typed data-access operations over one store namespace
pub struct AccessFacade<S: Store> {
    pub(super) store: S,
    pub(super) codec: RecordCodec,
    pub(super) config: FacadeConfig,
    pub(super) context: CursorContext,
}

/// Builder for [`AccessFacade`]
pub struct AccessFacadeBuilder<S: Store> {
    store: S,
    config: FacadeConfig,
    translator: Option<Box<dyn ErrorTranslator>>,
    sink: Option<Arc<dyn LogSink>>,
}

impl<S: Store> AccessFacadeBuilder<S> {
    pub fn config(mut self, config: FacadeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default error translator
    pub fn translator(mut self, translator: Box<dyn ErrorTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Replaces the default JSON logger
    pub fn log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validates the config and builds the facade
    pub fn build(self) -> ConfigResult<AccessFacade<S>> {
        self.config.validate()?;

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(JsonLogger::new(self.config.log_level)) as Arc<dyn LogSink>);
        let translator: Arc<dyn ErrorTranslator> = match self.translator {
            Some(t) => Arc::from(t),
            None => Arc::new(DefaultErrorTranslator),
        };

        Ok(AccessFacade {
            codec: RecordCodec::new(self.config.namespace.clone()),
            store: self.store,
            config: self.config,
            context: CursorContext { sink, translator },
        })
    }
}

impl<S: Store> AccessFacade<S> {
    pub fn builder(store: S) -> AccessFacadeBuilder<S> {
        AccessFacadeBuilder {
            store,
            config: FacadeConfig::default(),
            translator: None,
            sink: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    pub fn namespace(&self) -> &str {
        self.codec.namespace()
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Creates the record; fails with `DuplicateKey` if it exists
    pub fn insert<E: Entity>(&self, entity: &E) -> AccessResult<()> {
        let (key, data) = self.codec.encode(entity)?;
        self.put(&key, &data, ExistsPolicy::CreateOnly)
    }

    /// Creates the record under an explicit identifier
    pub fn insert_with_id<E: Entity>(&self, id: impl Into<Value>, entity: &E) -> AccessResult<()> {
        let (key, data) = self.codec.encode_with_id(&id.into(), entity)?;
        self.put(&key, &data, ExistsPolicy::CreateOnly)
    }

    /// Inserts each entity independently
    pub fn insert_all<E: Entity>(&self, entities: &[E]) -> BatchReport {
        self.run_batch("insert", entities, |e| self.insert(e))
    }

    /// Updates the record; fails with `RecordNotFound` if it is absent.
    ///
    /// Unset optional fields are not written, so a stored value survives
    /// when the entity's field has been cleared.
    pub fn update<E: Entity>(&self, entity: &E) -> AccessResult<()> {
        let (key, data) = self.codec.encode(entity)?;
        self.put(&key, &data, ExistsPolicy::UpdateOnly)
    }

    /// Updates the record under an explicit identifier
    pub fn update_with_id<E: Entity>(&self, id: impl Into<Value>, entity: &E) -> AccessResult<()> {
        let (key, data) = self.codec.encode_with_id(&id.into(), entity)?;
        self.put(&key, &data, ExistsPolicy::UpdateOnly)
    }

    /// Writes the record whether or not it exists.
    ///
    /// The write merges into an existing record: fields left unset on the
    /// entity keep their stored values.
    pub fn save<E: Entity>(&self, entity: &E) -> AccessResult<()> {
        let (key, data) = self.codec.encode(entity)?;
        self.put(&key, &data, ExistsPolicy::Upsert)
    }

    /// Writes the record under an explicit identifier
    pub fn save_with_id<E: Entity>(&self, id: impl Into<Value>, entity: &E) -> AccessResult<()> {
        let (key, data) = self.codec.encode_with_id(&id.into(), entity)?;
        self.put(&key, &data, ExistsPolicy::Upsert)
    }

    /// Saves each entity independently
    pub fn save_all<E: Entity>(&self, entities: &[E]) -> BatchReport {
        self.run_batch("save", entities, |e| self.save(e))
    }

    // ------------------------------------------------------------------
    // Deletes
    // ------------------------------------------------------------------

    /// Deletes by identifier, returning whether a record was removed
    pub fn delete_by_id<E: Entity>(&self, id: impl Into<Value>) -> AccessResult<bool> {
        let key = self.codec.key_for::<E>(&id.into())?;
        self.delete_key(&key)
    }

    /// Deletes the entity's record
    pub fn delete<E: Entity>(&self, entity: &E) -> AccessResult<bool> {
        let key = self.codec.key_of(entity)?;
        self.delete_key(&key)
    }

    /// Deletes each entity independently
    pub fn delete_entities<E: Entity>(&self, entities: &[E]) -> BatchReport {
        self.run_batch("delete", entities, |e| self.delete(e).map(|_| ()))
    }

    /// Deletes every record of `E`'s collection.
    ///
    /// Per-key failures are collected and the scan continues. A failure of
    /// the scan itself aborts with an error.
    pub fn delete_all<E: Entity>(&self) -> AccessResult<DeleteReport> {
        let collection = E::descriptor().collection();
        let scan = self.translated(self.store.scan(self.namespace(), collection, None))?;
        let mut scan = ScanGuard(scan);
        let mut report = DeleteReport::default();
        let interval = self.config.delete_progress_interval;

        while let Some(next) = scan.0.next_record() {
            let raw = next.map_err(|err| self.translate(err))?;
            match self.translated(self.store.delete(&raw.key)) {
                Ok(false) => {}
                Ok(true) => {
                    report.deleted += 1;
                    if report.deleted % interval == 0 {
                        let deleted = report.deleted.to_string();
                        self.sink().event(
                            Event::DeleteAllProgress,
                            &[("collection", collection), ("deleted", deleted.as_str())],
                        );
                    }
                }
                Err(err) => {
                    let key = raw.key.to_string();
                    self.sink().event(
                        Event::BatchItemFailed,
                        &[("operation", "delete_all"), ("key", key.as_str()), ("code", err.code())],
                    );
                    report.failed.push((key, err));
                }
            }
        }

        let deleted = report.deleted.to_string();
        let failed = report.failed.len().to_string();
        self.sink().event(
            Event::DeleteAllComplete,
            &[
                ("collection", collection),
                ("deleted", deleted.as_str()),
                ("failed", failed.as_str()),
            ],
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Reads one entity; absence is `None`
    pub fn find_by_id<E: Entity>(&self, id: impl Into<Value>) -> AccessResult<Option<E>> {
        let key = self.codec.key_for::<E>(&id.into())?;
        let record = self.translated(self.store.get(&key))?;
        Ok(self.codec.decode(&key, record.map(|r| r.data))?)
    }

    /// Reads several entities, in `ids` order, skipping absent ones
    pub fn find_by_ids<E, I, V>(&self, ids: I) -> AccessResult<Vec<E>>
    where
        E: Entity,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut found = Vec::new();
        for id in ids {
            if let Some(entity) = self.find_by_id(id)? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    pub fn exists_by_id<E: Entity>(&self, id: impl Into<Value>) -> AccessResult<bool> {
        let key = self.codec.key_for::<E>(&id.into())?;
        Ok(self.translated(self.store.get(&key))?.is_some())
    }

    /// Open cursor over the whole collection. The caller closes it.
    pub fn stream_all<E: Entity>(&self) -> AccessResult<LazyCursor<E>> {
        self.open_cursor(&QueryPlan::full_scan(None))
    }

    /// Every entity of the collection, in scan order
    pub fn find_all<E: Entity>(&self) -> AccessResult<Vec<E>> {
        self.stream_all()?.collect_all()
    }

    /// Every entity of the collection, sorted in memory
    pub fn find_all_sorted<E: Entity>(&self, sort: &Sort) -> AccessResult<Vec<E>> {
        let entities = self.find_all()?;
        Ok(ResultSorter::sort(entities, sort)?)
    }

    /// Streaming window over the collection: skips `offset`, yields at
    /// most `limit`
    pub fn find_in_range<E: Entity>(
        &self,
        offset: usize,
        limit: usize,
    ) -> AccessResult<RangeWindow<LazyCursor<E>>> {
        Ok(RangeWindow::new(self.stream_all()?, offset, limit))
    }

    /// One page of the collection with the approximate total.
    ///
    /// A sorted page materializes and sorts the whole collection first; an
    /// unsorted page streams through a window.
    pub fn find_page<E: Entity>(&self, request: &PageRequest) -> AccessResult<Page<E>> {
        let total = self.count::<E>()?;

        let content = match &request.sort {
            Some(sort) if request.is_sorted() => {
                let sorted = self.find_all_sorted::<E>(sort)?;
                let materialized = sorted.len().to_string();
                self.sink().event(
                    Event::PageSortMaterialized,
                    &[
                        ("collection", E::descriptor().collection()),
                        ("materialized", materialized.as_str()),
                    ],
                );
                sorted
                    .into_iter()
                    .skip(request.offset())
                    .take(request.size)
                    .collect()
            }
            _ => self
                .find_in_range::<E>(request.offset(), request.size)?
                .collect_all()?,
        };

        Ok(Page {
            content,
            page: request.page,
            size: request.size,
            total,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Splits `query` against the collection's current indexes
    pub fn plan<E: Entity>(&self, query: &Query) -> AccessResult<QueryPlan> {
        let collection = E::descriptor().collection();
        let indexes = self.translated(self.store.indexes(self.namespace(), collection))?;
        let metadata = IndexMetadata::for_entity::<E>(&indexes);
        Ok(QueryPlanner::new(&metadata).plan(query))
    }

    /// Describes how `query` would run
    pub fn explain<E: Entity>(&self, query: &Query) -> AccessResult<ExplainPlan> {
        Ok(ExplainPlan::from_plan(&self.plan::<E>(query)?))
    }

    /// Open cursor over the query's matches. Any sort is ignored.
    pub fn stream<E: Entity>(&self, query: &Query) -> AccessResult<LazyCursor<E>> {
        let plan = self.plan::<E>(query)?;
        self.open_cursor(&plan)
    }

    /// Every match of the query, sorted if the query asks for it
    pub fn find<E: Entity>(&self, query: &Query) -> AccessResult<Vec<E>> {
        let plan = self.plan::<E>(query)?;
        let entities = self.open_cursor::<E>(&plan)?.collect_all()?;
        match &plan.sort {
            Some(sort) => Ok(ResultSorter::sort(entities, sort)?),
            None => Ok(entities),
        }
    }

    /// Whether the query matches at least one entity
    pub fn exists<E: Entity>(&self, query: &Query) -> AccessResult<bool> {
        let mut cursor = self.stream::<E>(query)?;
        let found = cursor.has_next();
        cursor.close();
        found
    }

    /// Exact number of matches, by draining a cursor
    pub fn count_query<E: Entity>(&self, query: &Query) -> AccessResult<u64> {
        let mut cursor = self.stream::<E>(query)?;
        let mut count = 0;
        let outcome = loop {
            match cursor.try_next() {
                Ok(Some(_)) => count += 1,
                Ok(None) => break Ok(count),
                Err(err) => break Err(err),
            }
        };
        cursor.close();
        outcome
    }

    /// Runs a registered store-side aggregation over the collection.
    ///
    /// The optional qualifier is pushed to the store and must therefore be
    /// natively representable on an indexed field of the matching declared
    /// type.
    pub fn aggregate<E: Entity>(
        &self,
        qualifier: Option<&Qualifier>,
        module: &str,
        function: &str,
        args: &[Value],
    ) -> AccessResult<Vec<Value>> {
        let collection = E::descriptor().collection();
        let native_filter = match qualifier {
            Some(q) => {
                let indexes = self.translated(self.store.indexes(self.namespace(), collection))?;
                let metadata = IndexMetadata::for_entity::<E>(&indexes);
                let filter = QueryPlanner::new(&metadata).native_filter(q).ok_or_else(|| {
                    DataAccessError::invalid_usage(format!(
                        "aggregation filter '{}' cannot be evaluated by the store",
                        q
                    ))
                })?;
                Some(filter)
            }
            None => None,
        };

        self.translated(self.store.aggregate(
            self.namespace(),
            collection,
            native_filter.as_ref(),
            module,
            function,
            args,
        ))
    }

    // ------------------------------------------------------------------
    // Indexes
    // ------------------------------------------------------------------

    /// Creates a secondary index on one of `E`'s fields
    pub fn create_index<E: Entity>(
        &self,
        index_name: &str,
        field: &str,
        index_type: IndexType,
    ) -> AccessResult<()> {
        let collection = E::descriptor().collection();
        self.translated(self.store.create_index(
            self.namespace(),
            collection,
            index_name,
            field,
            index_type,
        ))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(super) fn sink(&self) -> &dyn LogSink {
        self.context.sink.as_ref()
    }

    pub(super) fn translate(&self, err: StoreError) -> DataAccessError {
        translate_or_wrap(self.context.translator.as_ref(), self.sink(), err)
    }

    pub(super) fn translated<T>(&self, result: StoreResult<T>) -> AccessResult<T> {
        result.map_err(|err| self.translate(err))
    }

    fn open_cursor<E: Entity>(&self, plan: &QueryPlan) -> AccessResult<LazyCursor<E>> {
        LazyCursor::open(
            &self.store,
            self.codec.clone(),
            plan.native_filter.as_ref(),
            ResidualFilter::for_entity::<E>(plan.residual.clone()),
            self.context.clone(),
        )
    }

    fn put(&self, key: &RecordKey, data: &RecordData, policy: ExistsPolicy) -> AccessResult<()> {
        self.translated(self.store.put(key, data, policy))?;
        let key = key.to_string();
        self.sink().event(
            Event::RecordWrite,
            &[("key", key.as_str()), ("policy", policy.as_str())],
        );
        Ok(())
    }

    fn delete_key(&self, key: &RecordKey) -> AccessResult<bool> {
        let existed = self.translated(self.store.delete(key))?;
        let key = key.to_string();
        self.sink().event(
            Event::RecordDelete,
            &[("key", key.as_str()), ("existed", if existed { "true" } else { "false" })],
        );
        Ok(existed)
    }

    fn run_batch<E>(
        &self,
        operation: &str,
        entities: &[E],
        op: impl Fn(&E) -> AccessResult<()>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, entity) in entities.iter().enumerate() {
            match op(entity) {
                Ok(()) => report.succeeded.push(index),
                Err(err) => {
                    let position = index.to_string();
                    self.sink().event(
                        Event::BatchItemFailed,
                        &[
                            ("operation", operation),
                            ("index", position.as_str()),
                            ("code", err.code()),
                        ],
                    );
                    report.failed.push((index, err));
                }
            }
        }
        report
    }
}

/// Closes a raw scan on every exit path
struct ScanGuard(Box<dyn ScanStream>);

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}
