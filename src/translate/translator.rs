//! Store error translation
//!
//! Default mapping by result code:
//!
//! - `KEY_EXISTS` to `DuplicateKey`
//! - `KEY_NOT_FOUND` to `RecordNotFound`
//! - `TIMEOUT` to `Timeout`
//! - `CONNECTION`, `NO_NODES`, `CLUSTER_UNAVAILABLE` to `Connectivity`
//! - parameter, namespace, bin type, index and UDF errors to `InvalidUsage`
//! - anything else has no mapping

use crate::observability::{Event, LogSink};
use crate::store::{ResultCode, StoreError};

use super::errors::DataAccessError;

/// Maps native store failures to the uniform taxonomy.
///
/// `None` means "no mapping"; the caller wraps the store failure as
/// `DataAccessError::Store`.
pub trait ErrorTranslator: Send + Sync {
    fn translate(&self, err: &StoreError) -> Option<DataAccessError>;
}

/// Result-code based translation
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorTranslator;

impl ErrorTranslator for DefaultErrorTranslator {
    fn translate(&self, err: &StoreError) -> Option<DataAccessError> {
        let message = err.message().to_string();
        let source = err.clone();
        let translated = match err.code() {
            ResultCode::KeyExists => DataAccessError::DuplicateKey { message, source },
            ResultCode::KeyNotFound => DataAccessError::RecordNotFound { message, source },
            ResultCode::Timeout => DataAccessError::Timeout { message, source },
            ResultCode::Connection | ResultCode::NoNodes | ResultCode::ClusterUnavailable => {
                DataAccessError::Connectivity { message, source }
            }
            ResultCode::ParameterError
            | ResultCode::InvalidNamespace
            | ResultCode::BinTypeError
            | ResultCode::IndexNotFound
            | ResultCode::IndexAlreadyExists
            | ResultCode::UdfNotFound => DataAccessError::InvalidUsage {
                message,
                source: Some(source),
            },
            ResultCode::ScanAborted | ResultCode::ServerError => return None,
        };
        Some(translated)
    }
}

/// Translates `err`, wrapping it as `DataAccessError::Store` when the
/// translator has no mapping. Untranslated failures are logged.
pub fn translate_or_wrap(
    translator: &dyn ErrorTranslator,
    sink: &dyn LogSink,
    err: StoreError,
) -> DataAccessError {
    match translator.translate(&err) {
        Some(translated) => translated,
        None => {
            sink.event(
                Event::StoreErrorUntranslated,
                &[("code", err.code().as_str()), ("message", err.message())],
            );
            DataAccessError::Store(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemoryLogSink;

    fn translate(code: ResultCode) -> Option<DataAccessError> {
        DefaultErrorTranslator.translate(&StoreError::new(code, "boom"))
    }

    #[test]
    fn test_default_mapping() {
        assert_eq!(translate(ResultCode::KeyExists).unwrap().code(), "KV_DUPLICATE_KEY");
        assert_eq!(translate(ResultCode::KeyNotFound).unwrap().code(), "KV_RECORD_NOT_FOUND");
        assert_eq!(translate(ResultCode::Timeout).unwrap().code(), "KV_TIMEOUT");
        for code in [ResultCode::Connection, ResultCode::NoNodes, ResultCode::ClusterUnavailable] {
            assert_eq!(translate(code).unwrap().code(), "KV_CONNECTIVITY");
        }
        for code in [
            ResultCode::ParameterError,
            ResultCode::InvalidNamespace,
            ResultCode::BinTypeError,
            ResultCode::IndexNotFound,
        ] {
            assert_eq!(translate(code).unwrap().code(), "KV_INVALID_USAGE");
        }
    }

    #[test]
    fn test_unmapped_codes() {
        assert!(translate(ResultCode::ServerError).is_none());
        assert!(translate(ResultCode::ScanAborted).is_none());
    }

    #[test]
    fn test_untranslated_failure_wrapped_and_logged() {
        let sink = MemoryLogSink::new();
        let err = translate_or_wrap(
            &DefaultErrorTranslator,
            &sink,
            StoreError::new(ResultCode::ServerError, "disk"),
        );
        assert_eq!(err.code(), "KV_STORE_ERROR");
        assert_eq!(sink.count(Event::StoreErrorUntranslated), 1);
    }

    #[test]
    fn test_translation_keeps_source() {
        let err = translate(ResultCode::IndexNotFound).unwrap();
        assert_eq!(err.store_error().unwrap().code(), ResultCode::IndexNotFound);
    }
}
