//! Domain errors for the Proctor governance pipeline.

use thiserror::Error;

/// Domain-level errors that can occur in the Proctor system.
///
/// Lookups for unknown IDs return `Ok(None)` or empty collections rather
/// than an error; `ValidationFailed` is the only error class surfaced for
/// bad caller input.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Model backend unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model call failed: {0}")]
    ModelFailed(String),

    #[error("Model call timed out after {0}s")]
    ModelTimeout(u64),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
