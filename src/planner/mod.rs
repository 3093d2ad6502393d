//! Query planning
//!
//! Turns a conjunctive query into a store scan plus client-side work.
//!
//! # Design Principles
//!
//! - Deterministic: same query and indexes give the same plan
//! - At most one native filter per scan
//! - Native filters only on fields with a matching secondary index
//! - Everything not promoted is evaluated as a strict conjunction

mod ast;
mod explain;
mod planner;

pub use ast::{FilterOp, Order, Qualifier, Query, Sort, SortDirection};
pub use explain::ExplainPlan;
pub use planner::{IndexMetadata, QueryPlan, QueryPlanner};
