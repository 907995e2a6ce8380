//! Filesystem infrastructure

mod error;
mod fs_store;

pub use error::FsStoreError;
pub use fs_store::{FsArtifactStore, StorageRoots};
