//! In-memory port doubles shared by the domain unit tests

use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use crate::compression::{ArtifactId, ArtifactKind, CompressionError, RequestId, TransientArtifact};
use crate::ports::{ArtifactStore, DocumentRewriter};

#[derive(Default)]
struct Inner {
    live: HashMap<ArtifactId, Vec<u8>>,
    releases: HashMap<ArtifactId, usize>,
    keys: Vec<String>,
    fail_writes_for: Option<ArtifactKind>,
    fail_releases: bool,
}

/// Artifact store that keeps bytes in memory and counts every release
#[derive(Default)]
pub(crate) struct RecordingStore {
    inner: Mutex<Inner>,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_writes(&self, kind: ArtifactKind) {
        self.inner.lock().unwrap().fail_writes_for = Some(kind);
    }

    pub(crate) fn fail_releases(&self) {
        self.inner.lock().unwrap().fail_releases = true;
    }

    pub(crate) fn live_count(&self) -> usize {
        self.inner.lock().unwrap().live.len()
    }

    pub(crate) fn release_count(&self, id: &ArtifactId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .releases
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Release counts for every artifact ever created
    pub(crate) fn release_counts(&self) -> Vec<usize> {
        self.inner.lock().unwrap().releases.values().copied().collect()
    }

    pub(crate) fn created_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().keys.clone()
    }
}

impl ArtifactStore for RecordingStore {
    fn materialize(
        &self,
        request_id: &RequestId,
        kind: ArtifactKind,
        data: Bytes,
    ) -> impl Future<Output = Result<TransientArtifact, CompressionError>> + Send {
        let result = {
            let mut inner = self.inner.lock().unwrap();
            if inner.fail_writes_for == Some(kind) {
                Err(CompressionError::storage("simulated write failure"))
            } else {
                let artifact = TransientArtifact::new(*request_id, kind, data.len() as u64);
                inner.keys.push(artifact.storage_key());
                inner.releases.insert(*artifact.id(), 0);
                inner.live.insert(*artifact.id(), data.to_vec());
                Ok(artifact)
            }
        };

        async move { result }
    }

    fn read(
        &self,
        artifact: &TransientArtifact,
    ) -> impl Future<Output = Result<Vec<u8>, CompressionError>> + Send {
        let result = self
            .inner
            .lock()
            .unwrap()
            .live
            .get(artifact.id())
            .cloned()
            .ok_or_else(|| CompressionError::storage("artifact not found"));

        async move { result }
    }

    fn release(&self, artifact: &TransientArtifact) -> Result<(), CompressionError> {
        let mut inner = self.inner.lock().unwrap();
        *inner.releases.entry(*artifact.id()).or_insert(0) += 1;
        if inner.fail_releases {
            return Err(CompressionError::storage("simulated delete failure"));
        }
        inner.live.remove(artifact.id());
        Ok(())
    }
}

/// Rewriter that drops every other byte
pub(crate) struct HalvingRewriter;

impl DocumentRewriter for HalvingRewriter {
    fn transform(
        &self,
        document: Bytes,
    ) -> impl Future<Output = Result<Vec<u8>, CompressionError>> + Send {
        async move { Ok(document.iter().step_by(2).copied().collect()) }
    }
}

/// Rewriter that doubles the document
pub(crate) struct GrowingRewriter;

impl DocumentRewriter for GrowingRewriter {
    fn transform(
        &self,
        document: Bytes,
    ) -> impl Future<Output = Result<Vec<u8>, CompressionError>> + Send {
        async move { Ok([document.as_ref(), document.as_ref()].concat()) }
    }
}

/// Rewriter that rejects every input
pub(crate) struct RejectingRewriter;

impl DocumentRewriter for RejectingRewriter {
    fn transform(
        &self,
        _document: Bytes,
    ) -> impl Future<Output = Result<Vec<u8>, CompressionError>> + Send {
        async move { Err(CompressionError::malformed_document("not a PDF")) }
    }
}
