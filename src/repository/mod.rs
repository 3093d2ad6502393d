//! Typed repositories
//!
//! A [`Repository`] fixes the entity type of an [`AccessFacade`] and exposes
//! the CRUD and paging contract for that one collection. Repositories are
//! cheap to clone; clones share the facade.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::facade::{AccessFacade, BatchReport, DeleteReport, Page, PageRequest};
use crate::mapping::{Entity, Value};
use crate::planner::Sort;
use crate::store::{IndexType, Store};
use crate::translate::AccessResult;

/// CRUD contract for entities of type `E`
pub struct Repository<E: Entity, S: Store> {
    facade: Arc<AccessFacade<S>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, S: Store> Clone for Repository<E, S> {
    fn clone(&self) -> Self {
        Self {
            facade: Arc::clone(&self.facade),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity, S: Store> Repository<E, S> {
    pub fn new(facade: Arc<AccessFacade<S>>) -> Self {
        Self {
            facade,
            _entity: PhantomData,
        }
    }

    pub fn facade(&self) -> &AccessFacade<S> {
        &self.facade
    }

    /// Upserts the entity
    pub fn save(&self, entity: &E) -> AccessResult<()> {
        self.facade.save(entity)
    }

    pub fn save_all(&self, entities: &[E]) -> BatchReport {
        self.facade.save_all(entities)
    }

    pub fn find_by_id(&self, id: impl Into<Value>) -> AccessResult<Option<E>> {
        self.facade.find_by_id(id)
    }

    pub fn find_all(&self) -> AccessResult<Vec<E>> {
        self.facade.find_all()
    }

    /// Found entities in `ids` order; absent ids are skipped
    pub fn find_all_by_id<I, V>(&self, ids: I) -> AccessResult<Vec<E>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.facade.find_by_ids(ids)
    }

    pub fn find_all_sorted(&self, sort: &Sort) -> AccessResult<Vec<E>> {
        self.facade.find_all_sorted(sort)
    }

    pub fn find_page(&self, request: &PageRequest) -> AccessResult<Page<E>> {
        self.facade.find_page(request)
    }

    pub fn exists(&self, id: impl Into<Value>) -> AccessResult<bool> {
        self.facade.exists_by_id::<E>(id)
    }

    /// Approximate collection size
    pub fn count(&self) -> AccessResult<u64> {
        self.facade.count::<E>()
    }

    pub fn delete(&self, entity: &E) -> AccessResult<bool> {
        self.facade.delete(entity)
    }

    pub fn delete_by_id(&self, id: impl Into<Value>) -> AccessResult<bool> {
        self.facade.delete_by_id::<E>(id)
    }

    pub fn delete_entities(&self, entities: &[E]) -> BatchReport {
        self.facade.delete_entities(entities)
    }

    pub fn delete_all(&self) -> AccessResult<DeleteReport> {
        self.facade.delete_all::<E>()
    }

    pub fn create_index(&self, index_name: &str, field: &str, index_type: IndexType) -> AccessResult<()> {
        self.facade.create_index::<E>(index_name, field, index_type)
    }
}
