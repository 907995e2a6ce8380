//! Compression domain module
//!
//! This module contains the core business logic and entities for document
//! compression. It defines what an upload and an artifact are, and how a single
//! request flows through the pipeline from intake to delivery.

pub mod entity;
pub mod error;
pub mod filename;
pub mod guard;
pub mod ids;
pub mod pipeline;
pub mod service;

pub use entity::{ArtifactKind, CompressionResult, TransientArtifact, UploadRequest};
pub use error::{CompressionError, ErrorKind, Result};
pub use filename::{output_filename, sanitize_filename};
pub use guard::ArtifactGuard;
pub use ids::{ArtifactId, RequestId};
pub use pipeline::{PipelineRun, PipelineState};
pub use service::{CompressedDocument, CompressionConfig, CompressionService};
