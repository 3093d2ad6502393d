//! Native store error types
//!
//! These are the failures the wire client reports. They never leave the
//! facade untranslated; see `crate::translate`.

use thiserror::Error;

/// Result codes reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// Create-only write hit an existing record
    KeyExists,
    /// Update-only write or operate on a missing record
    KeyNotFound,
    /// Client or server side timeout
    Timeout,
    /// Connection to a node failed
    Connection,
    /// No node available to serve the request
    NoNodes,
    /// Cluster not reachable or not formed
    ClusterUnavailable,
    /// Request parameters rejected
    ParameterError,
    /// Namespace unknown to the cluster
    InvalidNamespace,
    /// Operation incompatible with the stored bin type
    BinTypeError,
    /// Scan filter references a field without a matching index
    IndexNotFound,
    /// Index name already in use
    IndexAlreadyExists,
    /// Aggregation module or function unknown
    UdfNotFound,
    /// Scan aborted by the server
    ScanAborted,
    /// Generic server failure
    ServerError,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::KeyExists => "KEY_EXISTS",
            ResultCode::KeyNotFound => "KEY_NOT_FOUND",
            ResultCode::Timeout => "TIMEOUT",
            ResultCode::Connection => "CONNECTION",
            ResultCode::NoNodes => "NO_NODES",
            ResultCode::ClusterUnavailable => "CLUSTER_UNAVAILABLE",
            ResultCode::ParameterError => "PARAMETER_ERROR",
            ResultCode::InvalidNamespace => "INVALID_NAMESPACE",
            ResultCode::BinTypeError => "BIN_TYPE_ERROR",
            ResultCode::IndexNotFound => "INDEX_NOT_FOUND",
            ResultCode::IndexAlreadyExists => "INDEX_ALREADY_EXISTS",
            ResultCode::UdfNotFound => "UDF_NOT_FOUND",
            ResultCode::ScanAborted => "SCAN_ABORTED",
            ResultCode::ServerError => "SERVER_ERROR",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure reported by the store client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("store error {code}: {message}")]
pub struct StoreError {
    code: ResultCode,
    message: String,
}

impl StoreError {
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ResultCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
