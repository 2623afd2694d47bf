//! Error types for statebridge state stores.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during state store operations.
///
/// Callers on the HTTP side treat every variant the same way; the variants
/// exist so logs carry a useful cause.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid sidecar address: {0}")]
    Address(String),

    #[error("sidecar transport error: {0}")]
    Transport(String),

    #[error("sidecar request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("sidecar returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("internal error: {0}")]
    Internal(String),
}
