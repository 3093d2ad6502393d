//! Query execution
//!
//! Consumes plans and turns store scans into entity sequences.
//!
//! # Execution Flow (strict order)
//!
//! 1. Open one scan, narrowed by the native filter if any
//! 2. Evaluate residual qualifiers on each raw record
//! 3. Decode matching records
//! 4. Apply offset/limit windows lazily
//! 5. Sort only over a fully materialized result

mod cursor;
mod filters;
mod sorter;
mod window;

pub use cursor::{Cursor, CursorContext, CursorState, LazyCursor};
pub use filters::ResidualFilter;
pub use sorter::ResultSorter;
pub use window::RangeWindow;
