//! Error types for the store module.
//!
//! Provides a unified error type for all datastore operations. Write-path
//! failures carry this type unchanged to the caller; read paths in the
//! services above absorb it and degrade instead.

use thiserror::Error;

/// Unified error type for datastore operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found in the targeted collection.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Write rejected because the stored record no longer matches
    /// what the writer expected.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-level failure (connection, quota, corrupted record).
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a not-found error with the given key description.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error with the given message.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a backend error with the given message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::not_found("document_versions/abc123");
        assert_eq!(err.to_string(), "Record not found: document_versions/abc123");

        let err = StoreError::backend("write quota exceeded");
        assert_eq!(err.to_string(), "Store backend error: write quota exceeded");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let store_err: StoreError = json_err.into();
        assert!(matches!(store_err, StoreError::Serialization(_)));
    }
}
