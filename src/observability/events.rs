//! Observable data-access events
//!
//! Events are explicit and typed. Each carries a default severity.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Writes
    /// Record written (insert, update, save or atomic operation)
    RecordWrite,
    /// Record deleted
    RecordDelete,
    /// One item of a batch operation failed
    BatchItemFailed,

    // Scans
    /// Scan opened by a cursor
    CursorOpen,
    /// Cursor closed and scan released
    CursorClose,

    // Bulk deletion
    /// Periodic progress of a collection-wide delete
    DeleteAllProgress,
    /// Collection-wide delete finished
    DeleteAllComplete,

    // Queries
    /// A sorted page forced full materialization
    PageSortMaterialized,
    /// Set size derived from per-node counts
    CountApproximate,

    // Errors
    /// Store failure the translator had no mapping for
    StoreErrorUntranslated,
}

impl Event {
    /// Returns the event name as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RecordWrite => "RECORD_WRITE",
            Event::RecordDelete => "RECORD_DELETE",
            Event::BatchItemFailed => "BATCH_ITEM_FAILED",
            Event::CursorOpen => "CURSOR_OPEN",
            Event::CursorClose => "CURSOR_CLOSE",
            Event::DeleteAllProgress => "DELETE_ALL_PROGRESS",
            Event::DeleteAllComplete => "DELETE_ALL_COMPLETE",
            Event::PageSortMaterialized => "PAGE_SORT_MATERIALIZED",
            Event::CountApproximate => "COUNT_APPROXIMATE",
            Event::StoreErrorUntranslated => "STORE_ERROR_UNTRANSLATED",
        }
    }

    /// Default severity of the event
    pub fn severity(&self) -> Severity {
        match self {
            Event::RecordWrite | Event::RecordDelete | Event::CursorOpen | Event::CursorClose => {
                Severity::Trace
            }
            Event::DeleteAllProgress
            | Event::DeleteAllComplete
            | Event::PageSortMaterialized
            | Event::CountApproximate => Severity::Info,
            Event::BatchItemFailed => Severity::Warn,
            Event::StoreErrorUntranslated => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
