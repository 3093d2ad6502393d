//! kvmapper - typed data access over a clustered key-value store
//!
//! Maps domain entities onto store records, splits predicate queries
//! between one store-native filter and client-side residual qualifiers,
//! and exposes results as lazily streamed, windowed or sorted sequences.
//!
//! # Layout
//!
//! - [`mapping`]: entity descriptors, values and the record codec
//! - [`store`]: the consumed store interface and an in-memory store
//! - [`planner`]: queries and native filter selection
//! - [`executor`]: residual filtering, cursors, windows and sorting
//! - [`translate`]: the uniform error taxonomy
//! - [`facade`]: the public operations
//! - [`repository`]: per-entity CRUD contract
//! - [`observability`]: structured logging

pub mod executor;
pub mod facade;
pub mod mapping;
pub mod observability;
pub mod planner;
pub mod repository;
pub mod store;
pub mod translate;

pub use facade::{AccessFacade, FacadeConfig, Page, PageRequest};
pub use mapping::{Entity, EntityDescriptor, FieldType, Value};
pub use planner::{Order, Qualifier, Query, Sort};
pub use repository::Repository;
pub use translate::{AccessResult, DataAccessError};
