//! Scoped ownership of transient artifacts
//!
//! An [`ArtifactGuard`] is created the moment an artifact is materialized and
//! deletes it when dropped. Every exit path out of the pipeline, including `?`
//! early returns and an abandoned response body, therefore releases the artifact.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::compression::entity::TransientArtifact;
use crate::ports::ArtifactStore;

/// Owns one artifact and releases it exactly once
pub struct ArtifactGuard<S: ArtifactStore> {
    store: Arc<S>,
    artifact: TransientArtifact,
    released: bool,
}

impl<S: ArtifactStore> ArtifactGuard<S> {
    /// Take ownership of a freshly materialized artifact
    pub fn new(store: Arc<S>, artifact: TransientArtifact) -> Self {
        Self {
            store,
            artifact,
            released: false,
        }
    }

    /// The guarded artifact
    pub fn artifact(&self) -> &TransientArtifact {
        &self.artifact
    }

    /// Release the artifact now instead of at drop
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match self.store.release(&self.artifact) {
            Ok(()) => debug!(
                request_id = %self.artifact.request_id(),
                artifact_id = %self.artifact.id(),
                kind = %self.artifact.kind(),
                "Released artifact"
            ),
            // Cleanup is best-effort: the response has usually been sent already
            Err(err) => warn!(
                request_id = %self.artifact.request_id(),
                artifact_id = %self.artifact.id(),
                error = %err,
                "Failed to release artifact"
            ),
        }
    }
}

impl<S: ArtifactStore> Drop for ArtifactGuard<S> {
    fn drop(&mut self) {
        self.release_once();
    }
}
