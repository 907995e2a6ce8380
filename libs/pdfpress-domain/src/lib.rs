//! # PdfPress Domain Layer
//!
//! This crate contains the pure business logic and domain models for the PdfPress
//! document compression service. It follows hexagonal architecture principles:
//!
//! - **Entities**: Core domain models (UploadRequest, TransientArtifact, CompressionResult)
//! - **Ports**: Trait definitions for external dependencies (ArtifactStore, DocumentRewriter)
//! - **Services**: The per-request compression pipeline
//! - **Progress**: Client-side upload progress tracking
//!
//! ## Architecture
//!
//! This layer has NO dependencies on infrastructure concerns (filesystem, PDF
//! libraries, HTTP, etc.). All external dependencies are expressed as traits (ports)
//! that are implemented by adapter crates.
//!
//! ## Example
//!
//! ```rust
//! use pdfpress_domain::compression::{CompressionService, UploadRequest};
//! use pdfpress_domain::ports::{ArtifactStore, DocumentRewriter};
//!
//! // The service is generic over any store and rewriter implementation
//! async fn example<S: ArtifactStore, R: DocumentRewriter>(service: CompressionService<S, R>) {
//!     let upload = UploadRequest::new(Some("report.pdf"), b"%PDF-1.7 ...".to_vec().into(), None);
//!     match service.compress(upload).await {
//!         Ok(document) => println!("{}", document.result()),
//!         Err(err) => eprintln!("compression failed: {err}"),
//!     }
//! }
//! ```

pub mod compression;
pub mod ports;
pub mod progress;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use compression::{
    CompressedDocument, CompressionConfig, CompressionError, CompressionResult,
    CompressionService, RequestId, TransientArtifact, UploadRequest,
};
pub use ports::{ArtifactStore, DocumentRewriter};
pub use progress::{ProgressEvent, UploadProgress};
