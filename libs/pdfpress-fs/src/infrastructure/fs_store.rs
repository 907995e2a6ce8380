//! Filesystem Artifact Store Implementation
//!
//! This module implements the `ArtifactStore` trait on top of the local
//! filesystem. It handles all file operations and converts I/O errors to domain
//! errors.

use bytes::Bytes;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, info, instrument, warn};

use pdfpress_domain::{
    compression::{ArtifactKind, CompressionError, RequestId, TransientArtifact},
    ports::ArtifactStore,
};

use super::error::FsStoreError;

/// Directories holding incoming and outgoing artifacts
///
/// Both are process-lifetime constants passed in at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoots {
    /// Where uploaded originals are written
    pub incoming: PathBuf,
    /// Where rewritten documents are written
    pub outgoing: PathBuf,
}

impl StorageRoots {
    pub fn new(incoming: impl Into<PathBuf>, outgoing: impl Into<PathBuf>) -> Self {
        Self {
            incoming: incoming.into(),
            outgoing: outgoing.into(),
        }
    }

    /// Root directory for artifacts of `kind`
    pub fn root_for(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Original => &self.incoming,
            ArtifactKind::Rewritten => &self.outgoing,
        }
    }
}

/// Filesystem-based implementation of the ArtifactStore port
///
/// Artifacts are stored flat in their root with names derived only from the
/// request and artifact ids (see [`TransientArtifact::storage_key`]), so caller
/// input never reaches a path and concurrent requests never collide.
///
/// ## Error Handling
///
/// All I/O errors are converted to `CompressionError::Storage` with the
/// offending path in the message.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    roots: StorageRoots,
}

impl FsArtifactStore {
    /// Create a new filesystem store
    ///
    /// This performs no I/O; call [`prepare`](Self::prepare) before serving.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use pdfpress_fs::{FsArtifactStore, StorageRoots};
    ///
    /// # async fn example() {
    /// let store = FsArtifactStore::new(StorageRoots::new("uploads", "compressed"));
    /// let purged = store.prepare().await.unwrap();
    /// # }
    /// ```
    pub fn new(roots: StorageRoots) -> Self {
        info!(
            incoming = %roots.incoming.display(),
            outgoing = %roots.outgoing.display(),
            "Initializing FsArtifactStore"
        );
        Self { roots }
    }

    /// Get the storage roots
    pub fn roots(&self) -> &StorageRoots {
        &self.roots
    }

    /// Create both roots and delete artifacts left behind by a previous process
    ///
    /// Only files whose names look like artifact storage keys are removed, so a
    /// root shared with other files is left otherwise untouched.
    ///
    /// # Returns
    ///
    /// The number of stale artifacts removed
    pub async fn prepare(&self) -> Result<usize, CompressionError> {
        let mut purged = 0;

        for root in [&self.roots.incoming, &self.roots.outgoing] {
            tokio::fs::create_dir_all(root)
                .await
                .map_err(|err| FsStoreError::io(root, err))?;
            purged += purge_stale(root).await?;
        }

        if purged > 0 {
            warn!(purged, "Removed stale artifacts from a previous run");
        }
        Ok(purged)
    }

    /// Resolve the on-disk path of an artifact
    ///
    /// # Errors
    ///
    /// Returns `FsStoreError::OutsideRoot` if the key is not a single plain
    /// path segment.
    pub fn path_for(&self, artifact: &TransientArtifact) -> Result<PathBuf, FsStoreError> {
        let root = self.roots.root_for(artifact.kind());
        let key = artifact.storage_key();

        let mut components = Path::new(&key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(root.join(key)),
            _ => Err(FsStoreError::OutsideRoot(root.join(key))),
        }
    }

    /// Open an artifact for streaming
    ///
    /// # Errors
    ///
    /// Returns `CompressionError::Storage` if the file cannot be opened
    pub async fn open(
        &self,
        artifact: &TransientArtifact,
    ) -> Result<tokio::fs::File, CompressionError> {
        let path = self.path_for(artifact)?;
        tokio::fs::File::open(&path).await.map_err(|err| {
            error!(path = %path.display(), error = %err, "Failed to open artifact");
            FsStoreError::io(&path, err).into()
        })
    }

    #[instrument(
        skip(self, artifact, data),
        fields(request_id = %artifact.request_id(), kind = %artifact.kind(), size = data.len())
    )]
    async fn write_artifact(
        &self,
        artifact: TransientArtifact,
        data: Bytes,
    ) -> Result<TransientArtifact, CompressionError> {
        let path = self.path_for(&artifact)?;
        debug!(path = %path.display(), "Materializing artifact");

        // create_new: never clobber an existing artifact
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|err| {
                error!(path = %path.display(), error = %err, "Failed to create artifact");
                FsStoreError::io(&path, err)
            })?;

        let written = async {
            file.write_all(&data).await?;
            file.flush().await
        }
        .await;

        if let Err(err) = written {
            error!(path = %path.display(), error = %err, "Failed to write artifact");
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove partial artifact");
            }
            return Err(FsStoreError::io(&path, err).into());
        }

        debug!(path = %path.display(), "Artifact materialized");
        Ok(artifact)
    }

    #[instrument(skip(self, artifact), fields(artifact_id = %artifact.id()))]
    async fn read_artifact(&self, artifact: &TransientArtifact) -> Result<Vec<u8>, CompressionError> {
        let path = self.path_for(artifact)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), size = bytes.len(), "Read artifact");
                Ok(bytes)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read artifact");
                Err(FsStoreError::io(&path, err).into())
            }
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn materialize(
        &self,
        request_id: &RequestId,
        kind: ArtifactKind,
        data: Bytes,
    ) -> impl Future<Output = Result<TransientArtifact, CompressionError>> + Send {
        let artifact = TransientArtifact::new(*request_id, kind, data.len() as u64);
        let store = self.clone();

        async move { store.write_artifact(artifact, data).await }
    }

    fn read(
        &self,
        artifact: &TransientArtifact,
    ) -> impl Future<Output = Result<Vec<u8>, CompressionError>> + Send {
        let artifact = artifact.clone();
        let store = self.clone();

        async move { store.read_artifact(&artifact).await }
    }

    fn release(&self, artifact: &TransientArtifact) -> Result<(), CompressionError> {
        let path = self.path_for(artifact)?;

        match remove_file_in_place(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted artifact");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Artifact already deleted");
                Ok(())
            }
            Err(err) => Err(FsStoreError::io(&path, err).into()),
        }
    }
}

/// Unlink `path` from synchronous code that may be running on a runtime worker
///
/// On a multi-thread runtime the worker hands its queued tasks to another
/// thread for the duration of the call. A current-thread runtime has nowhere
/// to hand them, so the unlink runs in place there.
fn remove_file_in_place(path: &Path) -> std::io::Result<()> {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => {
            tokio::task::block_in_place(|| std::fs::remove_file(path))
        }
        _ => std::fs::remove_file(path),
    }
}

/// Delete every artifact-named file directly inside `root`
async fn purge_stale(root: &Path) -> Result<usize, FsStoreError> {
    let mut entries = tokio::fs::read_dir(root)
        .await
        .map_err(|err| FsStoreError::io(root, err))?;
    let mut purged = 0;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| FsStoreError::io(root, err))?
    {
        let name = entry.file_name();
        let is_file = entry
            .file_type()
            .await
            .map(|kind| kind.is_file())
            .unwrap_or(false);

        if !is_file || !name.to_str().is_some_and(is_artifact_name) {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => purged += 1,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "Failed to purge stale artifact")
            }
        }
    }

    Ok(purged)
}

/// Whether `name` has the shape `<uuid>-<uuid>.<artifact extension>`
fn is_artifact_name(name: &str) -> bool {
    let Some((stem, extension)) = name.rsplit_once('.') else {
        return false;
    };
    let known_extension = [ArtifactKind::Original, ArtifactKind::Rewritten]
        .iter()
        .any(|kind| kind.extension() == extension);

    known_extension
        && stem.len() == 73
        && stem.as_bytes()[36] == b'-'
        && looks_like_uuid(&stem[..36])
        && looks_like_uuid(&stem[37..])
}

fn looks_like_uuid(s: &str) -> bool {
    s.len() == 36
        && s.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_names_are_recognized() {
        let artifact = TransientArtifact::new(RequestId::new(), ArtifactKind::Original, 1);
        assert!(is_artifact_name(&artifact.storage_key()));

        let artifact = TransientArtifact::new(RequestId::new(), ArtifactKind::Rewritten, 1);
        assert!(is_artifact_name(&artifact.storage_key()));
    }

    #[test]
    fn test_foreign_files_are_not_artifacts() {
        assert!(!is_artifact_name("report.pdf"));
        assert!(!is_artifact_name(".gitkeep"));
        assert!(!is_artifact_name("compressed_passwd.pdf"));
        assert!(!is_artifact_name(
            "0190a0b0-0000-7000-8000-000000000000-0190a0b0-0000-7000-8000-000000000000.txt"
        ));
    }

    #[test]
    fn test_path_for_uses_root_by_kind() {
        let store = FsArtifactStore::new(StorageRoots::new("in", "out"));
        let request_id = RequestId::new();

        let original = TransientArtifact::new(request_id, ArtifactKind::Original, 1);
        let rewritten = TransientArtifact::new(request_id, ArtifactKind::Rewritten, 1);

        assert_eq!(
            store.path_for(&original).unwrap(),
            Path::new("in").join(original.storage_key())
        );
        assert_eq!(
            store.path_for(&rewritten).unwrap(),
            Path::new("out").join(rewritten.storage_key())
        );
    }
}
