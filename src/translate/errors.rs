//! Uniform data-access error taxonomy
//!
//! Every failure leaving the facade is a [`DataAccessError`]. Variants
//! produced from a store failure keep it as their `source`.

use thiserror::Error;

use crate::mapping::MappingError;
use crate::store::StoreError;

/// Result type for data-access operations
pub type AccessResult<T> = Result<T, DataAccessError>;

/// Data-access errors
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("Duplicate key: {message}")]
    DuplicateKey {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("Record not found: {message}")]
    RecordNotFound {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("Timeout: {message}")]
    Timeout {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("Connectivity failure: {message}")]
    Connectivity {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("Invalid usage: {message}")]
    InvalidUsage {
        message: String,
        #[source]
        source: Option<StoreError>,
    },

    #[error("Store failure: {0}")]
    Store(#[source] StoreError),

    #[error("Mapping failure: {0}")]
    Mapping(#[from] MappingError),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Unexpected store response: {0}")]
    UnexpectedResponse(String),
}

impl DataAccessError {
    /// Invalid usage detected before reaching the store
    pub fn invalid_usage(message: impl Into<String>) -> Self {
        DataAccessError::InvalidUsage {
            message: message.into(),
            source: None,
        }
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        DataAccessError::IllegalState(message.into())
    }

    pub fn unexpected_response(message: impl Into<String>) -> Self {
        DataAccessError::UnexpectedResponse(message.into())
    }

    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            DataAccessError::DuplicateKey { .. } => "KV_DUPLICATE_KEY",
            DataAccessError::RecordNotFound { .. } => "KV_RECORD_NOT_FOUND",
            DataAccessError::Timeout { .. } => "KV_TIMEOUT",
            DataAccessError::Connectivity { .. } => "KV_CONNECTIVITY",
            DataAccessError::InvalidUsage { .. } => "KV_INVALID_USAGE",
            DataAccessError::Store(_) => "KV_STORE_ERROR",
            DataAccessError::Mapping(_) => "KV_MAPPING_ERROR",
            DataAccessError::IllegalState(_) => "KV_ILLEGAL_STATE",
            DataAccessError::UnexpectedResponse(_) => "KV_UNEXPECTED_RESPONSE",
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataAccessError::Timeout { .. } | DataAccessError::Connectivity { .. }
        )
    }

    /// The store failure this error was produced from, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            DataAccessError::DuplicateKey { source, .. }
            | DataAccessError::RecordNotFound { source, .. }
            | DataAccessError::Timeout { source, .. }
            | DataAccessError::Connectivity { source, .. }
            | DataAccessError::Store(source) => Some(source),
            DataAccessError::InvalidUsage { source, .. } => source.as_ref(),
            _ => None,
        }
    }
}
