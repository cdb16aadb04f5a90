//! Error types for the state backend core.
//!
//! Every component surfaces the most specific kind it can determine and
//! stops; there is no retry or local recovery inside the core. The transport
//! layer maps these kinds to status codes.

use thiserror::Error;

/// Transport or protocol failure talking to the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The secret transit engine failed or returned an unexpected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransitError {
    pub message: String,
}

impl TransitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the state repository and lock manager.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Unparsable body, or a missing or wrong-typed `resources` section.
    #[error("malformed state document: {0}")]
    MalformedInput(String),

    /// The document store could not be reached or rejected the request.
    #[error("document store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// No snapshot has been stored yet, or the requested document is absent.
    #[error("state not found")]
    NotFound,

    /// The lock is already held by another writer.
    #[error("state is locked by another holder")]
    Conflict,

    /// A secret transit call failed.
    #[error("secret transit failure: {0}")]
    CryptoFailure(#[from] TransitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_store_unavailable() {
        let err: BackendError = StoreError::new("connection refused").into();
        assert!(matches!(err, BackendError::StoreUnavailable(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn transit_error_converts_to_crypto_failure() {
        let err: BackendError = TransitError::new("key not found").into();
        assert!(matches!(err, BackendError::CryptoFailure(_)));
    }
}
