//! Structured logging
//!
//! Log output goes through an injected [`LogSink`]; there is no global
//! logger.
//!
//! [`JsonLogger`] rules:
//! - One log line = one JSON object
//! - Deterministic key order: event, severity, ts, then fields sorted by key
//! - ERROR and FATAL go to stderr, everything else to stdout
//! - Synchronous, no buffering

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Per-record detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Destination for structured log events
pub trait LogSink: Send + Sync {
    /// Records one event. Must not fail or panic.
    fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]);

    /// Logs a typed event at its default severity
    fn event(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(event.severity(), event.as_str(), fields);
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn log(&self, _severity: Severity, _event: &str, _fields: &[(&str, &str)]) {}
}

/// A captured log event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    pub event: String,
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    /// Field value by key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps every event in memory, for tests and diagnostics
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured records
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured records for one event name
    pub fn events(&self, event: Event) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.event == event.as_str())
            .collect()
    }

    /// Number of captured records for one event name
    pub fn count(&self, event: Event) -> usize {
        self.events(event).len()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let record = LogRecord {
            severity,
            event: event.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// JSON-lines logger with a minimum severity
pub struct JsonLogger {
    min_level: Severity,
    writer: Option<Mutex<Box<dyn Write + Send>>>,
}

impl JsonLogger {
    /// Logs to stdout and stderr
    pub fn new(min_level: Severity) -> Self {
        Self {
            min_level,
            writer: None,
        }
    }

    /// Logs every line to `writer`, regardless of severity
    pub fn with_writer(min_level: Severity, writer: Box<dyn Write + Send>) -> Self {
        Self {
            min_level,
            writer: Some(Mutex::new(writer)),
        }
    }

    pub fn min_level(&self) -> Severity {
        self.min_level
    }

    /// Renders one log line, newline included
    pub fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut output = String::with_capacity(256);

        output.push('{');

        // Always output event first
        output.push_str("\"event\":");
        push_json_string(&mut output, event);

        output.push_str(",\"severity\":");
        push_json_string(&mut output, severity.as_str());

        output.push_str(",\"ts\":");
        push_json_string(
            &mut output,
            &Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );

        let mut sorted_fields: Vec<_> = fields.iter().collect();
        sorted_fields.sort_by_key(|(k, _)| *k);

        for (key, value) in sorted_fields {
            output.push(',');
            push_json_string(&mut output, key);
            output.push(':');
            push_json_string(&mut output, value);
        }

        output.push('}');
        output.push('\n');
        output
    }
}

impl LogSink for JsonLogger {
    fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity < self.min_level {
            return;
        }
        let line = Self::format_line(severity, event, fields);

        // Write failures are dropped: logging never fails an operation
        match &self.writer {
            Some(writer) => {
                let mut w = writer.lock().unwrap_or_else(PoisonError::into_inner);
                let _ = w.write_all(line.as_bytes());
                let _ = w.flush();
            }
            None if severity >= Severity::Error => {
                let mut err = io::stderr().lock();
                let _ = err.write_all(line.as_bytes());
                let _ = err.flush();
            }
            None => {
                let mut out = io::stdout().lock();
                let _ = out.write_all(line.as_bytes());
                let _ = out.flush();
            }
        }
    }
}

fn push_json_string(output: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => output.push_str(&quoted),
        Err(_) => output.push_str("\"\""),
    }
}
