//! Domain errors for compression operations
//!
//! This module defines all possible errors that can occur while a request moves
//! through the pipeline. These are domain-level errors that abstract away
//! infrastructure details.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while compressing a document
///
/// These errors represent business-level failures and are independent of
/// infrastructure implementation details (e.g., no `std::io` or PDF library
/// error types here). Every variant short-circuits the pipeline; none of them
/// is retried server-side.
#[derive(Error, Debug)]
pub enum CompressionError {
    /// The request body could not be decoded into an upload
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The payload is not a valid document
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The document is too large to be processed
    #[error("Document size ({size} bytes) exceeds maximum allowed ({max} bytes)")]
    DocumentTooLarge { size: u64, max: u64 },

    /// Failed to write, read or delete an artifact in the transient store
    #[error("Storage operation failed: {0}")]
    Storage(String),

    /// The client went away while the response was being delivered
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An unexpected internal error occurred
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`CompressionError`], recorded on failed pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    MalformedDocument,
    DocumentTooLarge,
    Storage,
    Transport,
    Config,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::MalformedDocument => "malformed_document",
            ErrorKind::DocumentTooLarge => "document_too_large",
            ErrorKind::Storage => "storage",
            ErrorKind::Transport => "transport",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl CompressionError {
    /// Create a bad request error with a message
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a malformed document error with a message
    pub fn malformed_document(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    /// Create a document too large error
    pub fn document_too_large(size: u64, max: u64) -> Self {
        Self::DocumentTooLarge { size, max }
    }

    /// Create a storage error with a message
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a transport error with a message
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a config error with a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::MalformedDocument(_) => ErrorKind::MalformedDocument,
            Self::DocumentTooLarge { .. } => ErrorKind::DocumentTooLarge,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller caused this error and must change the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest(_) | Self::MalformedDocument(_) | Self::DocumentTooLarge { .. }
        )
    }

    /// Whether resubmitting the same request unchanged may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Result type alias for compression operations
pub type Result<T> = std::result::Result<T, CompressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error() {
        let err = CompressionError::storage("disk full");
        assert!(matches!(err, CompressionError::Storage(_)));
        assert_eq!(err.to_string(), "Storage operation failed: disk full");
        assert!(err.is_retryable());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_document_too_large_error() {
        let err = CompressionError::document_too_large(1024, 512);
        assert!(matches!(err, CompressionError::DocumentTooLarge { .. }));
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("512"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_malformed_document_is_not_retryable() {
        let err = CompressionError::malformed_document("missing header");
        assert!(err.to_string().contains("Malformed document"));
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            CompressionError::transport("reset by peer").kind(),
            ErrorKind::Transport
        );
        assert_eq!(ErrorKind::MalformedDocument.to_string(), "malformed_document");
    }
}
