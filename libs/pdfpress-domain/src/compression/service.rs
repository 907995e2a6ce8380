//! Compression service - Business logic orchestration
//!
//! This module contains the per-request pipeline. The service coordinates the
//! artifact store and the document rewriter, and hands a [`CompressedDocument`]
//! to the delivery layer. Every artifact it creates is wrapped in an
//! [`ArtifactGuard`] the moment it exists, so no exit path leaks one.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    ArtifactGuard, ArtifactKind, CompressionError, CompressionResult, PipelineRun, PipelineState,
    RequestId, TransientArtifact, UploadRequest,
};
use crate::ports::{ArtifactStore, DocumentRewriter};

/// Configuration for the compression service
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Maximum accepted document size in bytes (default: 100MB)
    pub max_document_size: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_document_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Service running uploads through the compression pipeline
///
/// This service encapsulates the business rules for compression:
/// - Rejects empty and oversized documents before touching storage
/// - Materializes the original, rewrites it, materializes the result
/// - Computes size-reduction statistics
///
/// ## Static Dispatch
///
/// The service is generic over any `ArtifactStore` and `DocumentRewriter`
/// implementation. The store is shared through an `Arc` because guards handed to
/// the delivery layer may outlive the call that created them.
pub struct CompressionService<S, R> {
    store: Arc<S>,
    rewriter: R,
    config: CompressionConfig,
}

impl<S, R> CompressionService<S, R>
where
    S: ArtifactStore,
    R: DocumentRewriter,
{
    /// Create a new CompressionService with the given store, rewriter and configuration
    pub fn new(store: Arc<S>, rewriter: R, config: CompressionConfig) -> Self {
        Self {
            store,
            rewriter,
            config,
        }
    }

    /// Create a new CompressionService with default configuration
    pub fn with_defaults(store: Arc<S>, rewriter: R) -> Self {
        Self::new(store, rewriter, CompressionConfig::default())
    }

    /// Run one upload through the pipeline
    ///
    /// On success the returned [`CompressedDocument`] is in the `Delivering` state
    /// and owns both artifacts; they are released when it is completed, failed or
    /// dropped.
    ///
    /// # Errors
    ///
    /// - `CompressionError::MalformedDocument` if the document is empty or cannot be parsed
    /// - `CompressionError::DocumentTooLarge` if it exceeds the configured maximum
    /// - `CompressionError::Storage` if an artifact cannot be written or read back
    ///
    /// Any artifact created before the error has been released when this returns.
    pub async fn compress(
        &self,
        upload: UploadRequest,
    ) -> Result<CompressedDocument<S>, CompressionError> {
        let mut run = PipelineRun::new(*upload.request_id());

        info!(
            request_id = %upload.request_id(),
            filename = %upload.filename(),
            size = upload.size(),
            "Accepted upload"
        );

        match self.run_stages(&mut run, upload).await {
            Ok(stages) => Ok(CompressedDocument {
                run,
                original: stages.original,
                output: stages.output,
                result: stages.result,
                filename: stages.filename,
            }),
            Err(err) => {
                run.fail(&err);
                if err.is_client_error() {
                    warn!(request_id = %run.request_id(), error = %err, "Rejected upload");
                } else {
                    error!(request_id = %run.request_id(), error = %err, "Compression failed");
                }
                Err(err)
            }
        }
    }

    async fn run_stages(
        &self,
        run: &mut PipelineRun,
        upload: UploadRequest,
    ) -> Result<Stages<S>, CompressionError> {
        // Business rule: an empty upload is not a document
        if upload.size() == 0 {
            return Err(CompressionError::malformed_document("document is empty"));
        }

        // Business rule: enforce maximum document size
        if upload.size() > self.config.max_document_size {
            return Err(CompressionError::document_too_large(
                upload.size(),
                self.config.max_document_size,
            ));
        }

        let request_id = *upload.request_id();
        let filename = upload.output_filename();

        run.advance(PipelineState::Materializing);
        let original = self
            .materialize(&request_id, ArtifactKind::Original, upload.data().clone())
            .await?;
        drop(upload);

        // The rewrite works from the stored original, not the request buffer
        run.advance(PipelineState::Rewriting);
        let stored = self.store.read(original.artifact()).await?;
        let rewritten = self.rewriter.transform(Bytes::from(stored)).await?;
        if rewritten.is_empty() {
            return Err(CompressionError::internal("rewriter produced an empty document"));
        }

        run.advance(PipelineState::Delivering);
        let output = self
            .materialize(&request_id, ArtifactKind::Rewritten, Bytes::from(rewritten))
            .await?;

        let result = CompressionResult::new(original.artifact().size(), output.artifact().size());
        debug!(request_id = %request_id, result = %result, "Rewrite finished");

        Ok(Stages {
            original,
            output,
            result,
            filename,
        })
    }

    async fn materialize(
        &self,
        request_id: &RequestId,
        kind: ArtifactKind,
        data: Bytes,
    ) -> Result<ArtifactGuard<S>, CompressionError> {
        let artifact = self.store.materialize(request_id, kind, data).await?;
        Ok(ArtifactGuard::new(self.store.clone(), artifact))
    }

    /// Get the artifact store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the service configuration
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }
}

struct Stages<S: ArtifactStore> {
    original: ArtifactGuard<S>,
    output: ArtifactGuard<S>,
    result: CompressionResult,
    filename: String,
}

/// A rewritten document waiting to be delivered
///
/// Owns both artifacts of the request. Call [`complete`](Self::complete) once
/// the response body has been fully sent, or [`fail`](Self::fail) when sending
/// broke. Dropping it without either counts as a client disconnect. In every
/// case both artifacts are released exactly once.
pub struct CompressedDocument<S: ArtifactStore> {
    run: PipelineRun,
    original: ArtifactGuard<S>,
    output: ArtifactGuard<S>,
    result: CompressionResult,
    filename: String,
}

impl<S: ArtifactStore> CompressedDocument<S> {
    pub fn request_id(&self) -> &RequestId {
        self.run.request_id()
    }

    pub fn state(&self) -> PipelineState {
        self.run.state()
    }

    /// Size-reduction statistics
    pub fn result(&self) -> &CompressionResult {
        &self.result
    }

    /// Name to offer the caller, `compressed_<original>`
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The uploaded original
    pub fn original(&self) -> &TransientArtifact {
        self.original.artifact()
    }

    /// The rewritten document to deliver
    pub fn output(&self) -> &TransientArtifact {
        self.output.artifact()
    }

    /// Delivery finished: mark the run completed and release both artifacts
    ///
    /// Returns the terminal state that was recorded.
    pub fn complete(mut self) -> PipelineState {
        self.run.advance(PipelineState::Completed);
        info!(
            request_id = %self.run.request_id(),
            original_size = self.result.original_size(),
            compressed_size = self.result.compressed_size(),
            reduction_percent = self.result.reduction_percent(),
            elapsed_ms = self.run.elapsed_ms(),
            "Compression completed"
        );
        self.run.state()
    }

    /// Delivery broke: mark the run failed and release both artifacts
    ///
    /// Transport errors are an expected condition and are only logged at debug.
    pub fn fail(mut self, err: CompressionError) -> PipelineState {
        self.run.fail(&err);
        match err {
            CompressionError::Transport(_) => {
                debug!(request_id = %self.run.request_id(), error = %err, "Delivery interrupted")
            }
            _ => {
                error!(request_id = %self.run.request_id(), error = %err, "Delivery failed")
            }
        }
        self.run.state()
    }
}

impl<S: ArtifactStore> Drop for CompressedDocument<S> {
    fn drop(&mut self) {
        if !self.run.state().is_terminal() {
            self.run
                .fail(&CompressionError::transport("response abandoned before completion"));
            debug!(request_id = %self.run.request_id(), "Client disconnected during delivery");
        }
        // Fields drop after this, which releases both artifacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ArtifactStore;
    use crate::testing::{GrowingRewriter, HalvingRewriter, RecordingStore, RejectingRewriter};
    use std::collections::HashSet;

    fn upload(data: &'static [u8]) -> UploadRequest {
        UploadRequest::new(Some("report.pdf"), Bytes::from_static(data), None)
    }

    fn assert_all_released_once(store: &RecordingStore) {
        assert_eq!(store.live_count(), 0, "no artifact may outlive its request");
        assert!(
            store.release_counts().iter().all(|count| *count == 1),
            "every artifact must be released exactly once: {:?}",
            store.release_counts()
        );
    }

    #[tokio::test]
    async fn test_compress_success() {
        let store = Arc::new(RecordingStore::new());
        let service = CompressionService::with_defaults(store.clone(), HalvingRewriter);

        let document = service.compress(upload(b"0123456789")).await.unwrap();

        assert_eq!(document.state(), PipelineState::Delivering);
        assert_eq!(document.filename(), "compressed_report.pdf");
        assert_eq!(document.result().original_size(), 10);
        assert_eq!(document.result().compressed_size(), 5);
        assert_eq!(document.result().reduction_percent(), 50.0);
        assert_eq!(store.live_count(), 2);

        let bytes = store.read(document.output()).await.unwrap();
        assert_eq!(bytes, b"02468");

        assert_eq!(document.complete(), PipelineState::Completed);
        assert_all_released_once(&store);
    }

    #[tokio::test]
    async fn test_growth_is_reported_not_rejected() {
        let store = Arc::new(RecordingStore::new());
        let service = CompressionService::with_defaults(store.clone(), GrowingRewriter);

        let document = service.compress(upload(b"abcd")).await.unwrap();

        assert_eq!(document.result().reduction_percent(), -100.0);
        document.complete();
        assert_all_released_once(&store);
    }

    #[tokio::test]
    async fn test_empty_upload_is_malformed() {
        let store = Arc::new(RecordingStore::new());
        let service = CompressionService::with_defaults(store.clone(), HalvingRewriter);

        let result = service.compress(upload(b"")).await;

        assert!(matches!(
            result.err(),
            Some(CompressionError::MalformedDocument(_))
        ));
        assert!(store.created_keys().is_empty());
    }

    #[tokio::test]
    async fn test_too_large_upload_is_rejected_before_storage() {
        let store = Arc::new(RecordingStore::new());
        let config = CompressionConfig {
            max_document_size: 4,
        };
        let service = CompressionService::new(store.clone(), HalvingRewriter, config);

        let result = service.compress(upload(b"0123456789")).await;

        assert!(matches!(
            result.err(),
            Some(CompressionError::DocumentTooLarge { size: 10, max: 4 })
        ));
        assert!(store.created_keys().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_document_releases_original() {
        let store = Arc::new(RecordingStore::new());
        let service = CompressionService::with_defaults(store.clone(), RejectingRewriter);

        let result = service.compress(upload(b"not a pdf")).await;

        assert!(matches!(
            result.err(),
            Some(CompressionError::MalformedDocument(_))
        ));
        assert_eq!(store.created_keys().len(), 1);
        assert_all_released_once(&store);
    }

    #[tokio::test]
    async fn test_original_write_failure_is_storage_error() {
        let store = Arc::new(RecordingStore::new());
        store.fail_writes(ArtifactKind::Original);
        let service = CompressionService::with_defaults(store.clone(), HalvingRewriter);

        let result = service.compress(upload(b"0123")).await;

        assert!(matches!(result.err(), Some(CompressionError::Storage(_))));
        assert_eq!(store.live_count(), 0);
    }

    #[tokio::test]
    async fn test_output_write_failure_releases_original() {
        let store = Arc::new(RecordingStore::new());
        store.fail_writes(ArtifactKind::Rewritten);
        let service = CompressionService::with_defaults(store.clone(), HalvingRewriter);

        let result = service.compress(upload(b"0123")).await;

        assert!(matches!(result.err(), Some(CompressionError::Storage(_))));
        assert_eq!(store.created_keys().len(), 1);
        assert_all_released_once(&store);
    }

    #[tokio::test]
    async fn test_failed_delivery_releases_both() {
        let store = Arc::new(RecordingStore::new());
        let service = CompressionService::with_defaults(store.clone(), HalvingRewriter);

        let document = service.compress(upload(b"0123")).await.unwrap();
        let state = document.fail(CompressionError::transport("connection reset"));

        assert_eq!(state, PipelineState::Failed(crate::compression::ErrorKind::Transport));

        assert_all_released_once(&store);
    }

    #[tokio::test]
    async fn test_dropped_document_releases_both() {
        let store = Arc::new(RecordingStore::new());
        let service = CompressionService::with_defaults(store.clone(), HalvingRewriter);

        let document = service.compress(upload(b"0123")).await.unwrap();
        drop(document);

        assert_all_released_once(&store);
    }

    #[tokio::test]
    async fn test_concurrent_requests_do_not_collide() {
        let store = Arc::new(RecordingStore::new());
        let service = CompressionService::with_defaults(store.clone(), HalvingRewriter);

        let (first, second) = tokio::join!(
            service.compress(upload(b"first document")),
            service.compress(upload(b"second document")),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_ne!(first.request_id(), second.request_id());
        assert_eq!(store.read(first.output()).await.unwrap(), b"frtdcmn");
        assert_eq!(store.read(second.output()).await.unwrap(), b"scn ouet");

        let keys: HashSet<String> = store.created_keys().into_iter().collect();
        assert_eq!(keys.len(), 4);

        first.complete();
        // Releasing one request leaves the other's artifacts intact
        assert_eq!(store.live_count(), 2);
        second.complete();
        assert_all_released_once(&store);
    }
}
