//! Domain entities for document compression
//!
//! An [`UploadRequest`] is what the caller sent, a [`TransientArtifact`] is a
//! file-like byte sequence that lives in the transient store for the duration of
//! one request, and a [`CompressionResult`] reports how much smaller the rewritten
//! document is.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::compression::filename::{output_filename, sanitize_filename, DEFAULT_FILENAME};
use crate::compression::ids::{ArtifactId, RequestId};

/// A decoded upload, ready to enter the pipeline
///
/// Created when the request body has been fully decoded and consumed exactly
/// once by [`CompressionService::compress`](crate::compression::CompressionService::compress).
/// The caller-supplied filename is sanitized on construction; the raw value is
/// kept only for logging.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    request_id: RequestId,
    original_filename: String,
    filename: String,
    data: Bytes,
    declared_length: Option<u64>,
    received_at: DateTime<Utc>,
}

impl UploadRequest {
    /// Create a new upload from decoded request parts
    ///
    /// # Arguments
    ///
    /// * `filename` - The filename supplied by the caller, if any
    /// * `data` - The document bytes
    /// * `declared_length` - The length the caller declared for the request body, if any
    pub fn new(filename: Option<&str>, data: Bytes, declared_length: Option<u64>) -> Self {
        let original_filename = filename.unwrap_or(DEFAULT_FILENAME).to_string();
        Self {
            request_id: RequestId::new(),
            filename: sanitize_filename(&original_filename),
            original_filename,
            data,
            declared_length,
            received_at: Utc::now(),
        }
    }

    /// Get the request identifier
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// The filename exactly as the caller sent it (untrusted)
    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    /// The sanitized filename, safe to use in headers and file names
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The name the rewritten document is delivered under
    pub fn output_filename(&self) -> String {
        output_filename(&self.filename)
    }

    /// The document bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size of the document in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Length declared by the caller for the whole request body
    pub fn declared_length(&self) -> Option<u64> {
        self.declared_length
    }

    /// When the upload was fully received
    pub fn received_at(&self) -> &DateTime<Utc> {
        &self.received_at
    }
}

/// Which side of the rewrite an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The document as uploaded
    Original,
    /// The document produced by the rewriter
    Rewritten,
}

impl ArtifactKind {
    /// File extension used for artifacts of this kind
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Original => "upload",
            ArtifactKind::Rewritten => "pdf",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Original => f.write_str("original"),
            ArtifactKind::Rewritten => f.write_str("rewritten"),
        }
    }
}

/// A byte sequence held in transient storage during a single request
///
/// Artifacts are exclusively owned by the pipeline run that created them and
/// must be released before that run is discarded. The storage key is derived
/// only from generated identifiers, never from caller input, so two requests
/// can never collide on a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientArtifact {
    id: ArtifactId,
    request_id: RequestId,
    kind: ArtifactKind,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

impl TransientArtifact {
    /// Create a new artifact descriptor for a request
    ///
    /// This is a pure domain constructor - it doesn't perform any I/O.
    pub fn new(request_id: RequestId, kind: ArtifactKind, size_bytes: u64) -> Self {
        Self {
            id: ArtifactId::new(),
            request_id,
            kind,
            size_bytes,
            created_at: Utc::now(),
        }
    }

    /// Get the artifact's unique identifier
    pub fn id(&self) -> &ArtifactId {
        &self.id
    }

    /// Get the owning request's identifier
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Get the artifact kind
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Get the size of the artifact in bytes
    pub fn size(&self) -> u64 {
        self.size_bytes
    }

    /// Get the creation timestamp
    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    /// Storage key: a single flat path segment, unique per artifact
    pub fn storage_key(&self) -> String {
        format!("{}-{}.{}", self.request_id, self.id, self.kind.extension())
    }
}

/// Size-reduction statistics for one rewrite
///
/// The reduction may be negative when the rewritten document is larger than the
/// original. That is a valid, reportable outcome and not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompressionResult {
    original_size: u64,
    compressed_size: u64,
    reduction_percent: f64,
}

impl CompressionResult {
    /// Compute the result for a pair of sizes
    ///
    /// `reduction = (original - compressed) / original * 100`, rounded to two
    /// decimals. An empty original yields a reduction of zero.
    pub fn new(original_size: u64, compressed_size: u64) -> Self {
        let reduction_percent = if original_size == 0 {
            0.0
        } else {
            let raw = (original_size as f64 - compressed_size as f64) / original_size as f64
                * 100.0;
            (raw * 100.0).round() / 100.0
        };

        Self {
            original_size,
            compressed_size,
            reduction_percent,
        }
    }

    /// Size of the original document in bytes
    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    /// Size of the rewritten document in bytes
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Reduction percentage, rounded to two decimals
    pub fn reduction_percent(&self) -> f64 {
        self.reduction_percent
    }

    /// Bytes saved; negative when the document grew
    pub fn bytes_saved(&self) -> i64 {
        self.original_size as i64 - self.compressed_size as i64
    }

    /// Whether the rewrite made the document larger
    pub fn grew(&self) -> bool {
        self.compressed_size > self.original_size
    }
}

impl fmt::Display for CompressionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} bytes ({:.2}% reduction)",
            self.original_size, self.compressed_size, self.reduction_percent
        )
    }
}
