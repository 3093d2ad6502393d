//! Observability
//!
//! Structured, synchronous event logging through an injected sink.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Logging never fails an operation
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use kvmapper::observability::{Event, JsonLogger, LogSink, Severity};
//!
//! let sink: Arc<dyn LogSink> = Arc::new(JsonLogger::new(Severity::Info));
//! sink.event(Event::CountApproximate, &[("count", "42")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{JsonLogger, LogRecord, LogSink, MemoryLogSink, NoopLogSink, Severity};
