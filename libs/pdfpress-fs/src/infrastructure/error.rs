//! Error types for the filesystem store

use std::path::PathBuf;
use thiserror::Error;

use pdfpress_domain::CompressionError;

/// Errors raised by [`FsArtifactStore`](super::FsArtifactStore) before they are
/// converted to domain errors
#[derive(Error, Debug)]
pub enum FsStoreError {
    /// An I/O operation on a path failed
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A computed artifact path would leave its storage root
    #[error("Artifact path '{0}' escapes the storage root")]
    OutsideRoot(PathBuf),
}

impl FsStoreError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<FsStoreError> for CompressionError {
    fn from(err: FsStoreError) -> Self {
        CompressionError::storage(err.to_string())
    }
}
