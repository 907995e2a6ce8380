//! Ports (trait definitions) for external dependencies
//!
//! This module defines the contracts (ports) that external adapters must implement.
//! Following hexagonal architecture, the domain defines what it needs, and the
//! infrastructure provides implementations.
//!
//! ## Static Dispatch
//!
//! We use native Rust async traits with `impl Future` return types instead of
//! `async_trait` to ensure zero-cost abstractions and static dispatch.

use bytes::Bytes;
use std::future::Future;

use crate::compression::{
    entity::{ArtifactKind, TransientArtifact},
    error::CompressionError,
    ids::RequestId,
};

/// Port for the transient artifact store
///
/// This trait abstracts away where artifacts live (filesystem, memory, ...).
/// Implementations must handle:
/// - Writing bytes under a request-unique name
/// - Converting infrastructure errors to `CompressionError::Storage`
/// - Idempotent deletion
pub trait ArtifactStore: Send + Sync {
    /// Persist a byte sequence and return a handle to it
    ///
    /// # Arguments
    ///
    /// * `request_id` - The request that owns the artifact
    /// * `kind` - Whether this is the uploaded original or the rewritten output
    /// * `data` - The bytes to store
    ///
    /// # Errors
    ///
    /// Returns `CompressionError::Storage` if the write fails. A failed write
    /// must not leave a partial artifact behind.
    fn materialize(
        &self,
        request_id: &RequestId,
        kind: ArtifactKind,
        data: Bytes,
    ) -> impl Future<Output = Result<TransientArtifact, CompressionError>> + Send;

    /// Read an artifact's bytes back
    ///
    /// # Errors
    ///
    /// Returns `CompressionError::Storage` if the artifact is missing or unreadable
    fn read(
        &self,
        artifact: &TransientArtifact,
    ) -> impl Future<Output = Result<Vec<u8>, CompressionError>> + Send;

    /// Delete an artifact
    ///
    /// This is synchronous so it can run from `Drop`. Releasing an artifact that
    /// is already gone succeeds.
    ///
    /// Callers are usually response bodies being dropped or finished on an
    /// async runtime worker, so this blocks that worker. Implementations must
    /// keep it to a single short operation, and should step out of the
    /// worker (`tokio::task::block_in_place`) when the runtime allows it.
    ///
    /// # Errors
    ///
    /// Returns `CompressionError::Storage` if the artifact exists but cannot be deleted
    fn release(&self, artifact: &TransientArtifact) -> Result<(), CompressionError>;
}

/// Port for the document rewrite transform
///
/// The transform itself is opaque: it reloads a document and re-serializes its
/// object structure in full (no incremental update sections). The input is an
/// immutable buffer so the caller's bytes can never be modified.
pub trait DocumentRewriter: Send + Sync {
    /// Rewrite a document and return the new bytes
    ///
    /// # Errors
    ///
    /// Returns `CompressionError::MalformedDocument` if the input cannot be parsed
    fn transform(
        &self,
        document: Bytes,
    ) -> impl Future<Output = Result<Vec<u8>, CompressionError>> + Send;
}
