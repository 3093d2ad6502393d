//! Data-access facade
//!
//! The public, synchronous operations over a [`Store`](crate::store::Store):
//! writes with existence policies, reads, deletes, queries, windows,
//! pages, approximate counts, atomic mutations and aggregation.
//!
//! # Guarantees
//!
//! - No store failure leaves the facade untranslated
//! - Every cursor opened internally is closed on every exit path
//! - Absence is `None` or `false`, never an error
//! - Batch operations report per-item outcomes and never stop early

mod atomic;
mod config;
mod count;
mod facade;
mod report;

pub use config::{ConfigError, ConfigResult, FacadeConfig};
pub use facade::{AccessFacade, AccessFacadeBuilder};
pub use report::{BatchReport, DeleteReport, Page, PageRequest};
