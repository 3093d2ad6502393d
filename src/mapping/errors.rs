//! Mapping error types
//!
//! Error codes:
//! - KV_MAPPING_MISSING_ID
//! - KV_MAPPING_UNSUPPORTED_TYPE
//! - KV_MAPPING_TYPE_MISMATCH
//! - KV_MAPPING_UNKNOWN_FIELD
//! - KV_MAPPING_INVALID_DESCRIPTOR

use std::fmt;

/// Mapping-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorCode {
    /// Identifier absent, null or empty at encode time
    MissingId,
    /// Value type cannot be stored for this field or identifier
    UnsupportedType,
    /// Stored value does not match the declared field type
    TypeMismatch,
    /// Field is not declared on the entity
    UnknownField,
    /// Descriptor table failed validation
    InvalidDescriptor,
}

impl MappingErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            MappingErrorCode::MissingId => "KV_MAPPING_MISSING_ID",
            MappingErrorCode::UnsupportedType => "KV_MAPPING_UNSUPPORTED_TYPE",
            MappingErrorCode::TypeMismatch => "KV_MAPPING_TYPE_MISMATCH",
            MappingErrorCode::UnknownField => "KV_MAPPING_UNKNOWN_FIELD",
            MappingErrorCode::InvalidDescriptor => "KV_MAPPING_INVALID_DESCRIPTOR",
        }
    }
}

impl fmt::Display for MappingErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error raised while converting between entities and records
#[derive(Debug, Clone, PartialEq)]
pub struct MappingError {
    code: MappingErrorCode,
    message: String,
    field: Option<String>,
}

impl MappingError {
    /// Identifier missing or empty
    pub fn missing_id(collection: impl Into<String>) -> Self {
        Self {
            code: MappingErrorCode::MissingId,
            message: format!(
                "Entity of collection '{}' has no identifier",
                collection.into()
            ),
            field: None,
        }
    }

    /// Value of an unsupported type
    pub fn unsupported_type(field: impl Into<String>, found: &str) -> Self {
        let f = field.into();
        Self {
            code: MappingErrorCode::UnsupportedType,
            message: format!("Field '{}' holds unsupported type {}", f, found),
            field: Some(f),
        }
    }

    /// Value does not match the declared type
    pub fn type_mismatch(field: impl Into<String>, expected: &str, found: &str) -> Self {
        let f = field.into();
        Self {
            code: MappingErrorCode::TypeMismatch,
            message: format!(
                "Field '{}' expected {} but found {}",
                f, expected, found
            ),
            field: Some(f),
        }
    }

    /// Conversion failure raised from inside a field setter, before the
    /// field name is known
    pub fn conversion(expected: &str, found: &str) -> Self {
        Self {
            code: MappingErrorCode::TypeMismatch,
            message: format!("expected {} but found {}", expected, found),
            field: None,
        }
    }

    /// Field not declared on the entity
    pub fn unknown_field(collection: &str, field: impl Into<String>) -> Self {
        let f = field.into();
        Self {
            code: MappingErrorCode::UnknownField,
            message: format!("Collection '{}' declares no field '{}'", collection, f),
            field: Some(f),
        }
    }

    /// Descriptor table rejected by the builder
    pub fn invalid_descriptor(reason: impl Into<String>) -> Self {
        Self {
            code: MappingErrorCode::InvalidDescriptor,
            message: reason.into(),
            field: None,
        }
    }

    /// Attaches a field name to an error produced without one
    pub fn for_field(mut self, field: &str) -> Self {
        if self.field.is_none() {
            self.message = format!("Field '{}': {}", field, self.message);
            self.field = Some(field.to_string());
        }
        self
    }

    /// Returns the error code
    pub fn code(&self) -> MappingErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending field if known
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for MappingError {}

/// Result type for mapping operations
pub type MappingResult<T> = Result<T, MappingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(MappingErrorCode::MissingId.code(), "KV_MAPPING_MISSING_ID");
        assert_eq!(
            MappingErrorCode::TypeMismatch.code(),
            "KV_MAPPING_TYPE_MISMATCH"
        );
    }

    #[test]
    fn test_for_field_attaches_once() {
        let err = MappingError::conversion("string", "integer").for_field("name");
        assert_eq!(err.field(), Some("name"));
        assert!(err.message().contains("name"));

        let err = err.for_field("other");
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_display_includes_code() {
        let err = MappingError::missing_id("Person");
        let display = format!("{}", err);
        assert!(display.contains("KV_MAPPING_MISSING_ID"));
        assert!(display.contains("Person"));
    }
}
