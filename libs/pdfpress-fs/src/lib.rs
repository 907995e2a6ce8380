//! Filesystem adapter for the PdfPress transient artifact store
//!
//! Uploaded originals and rewritten documents are kept as flat files under two
//! configured roots for the lifetime of a single request.

pub mod infrastructure;

pub use infrastructure::{FsArtifactStore, FsStoreError, StorageRoots};
