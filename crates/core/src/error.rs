//! Model error type.

use thiserror::Error;

/// Result type used by fallible entity operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while mutating attributes or rebuilding an entity from a mapping.
///
/// Construction, `save` and serialization never fail; only the operations that
/// accept caller-provided data return this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A required key was absent from the mapping.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A key was present but held a value of the wrong JSON type.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A timestamp was not a valid ISO-8601 date-time.
    #[error("invalid timestamp for `{field}`: {value}")]
    InvalidTimestamp { field: String, value: String },

    /// The mapping's `__class__` tag names a different variant.
    #[error("class mismatch (expected: {expected}, found: {found})")]
    ClassMismatch { expected: String, found: String },

    /// Attempted to overwrite a key the entity manages itself.
    #[error("attribute `{0}` is reserved")]
    ReservedAttribute(String),
}

impl ModelError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_timestamp(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn reserved(name: impl Into<String>) -> Self {
        Self::ReservedAttribute(name.into())
    }
}
