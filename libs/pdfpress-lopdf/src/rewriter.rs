//! lopdf Document Rewriter Implementation
//!
//! This module implements the `DocumentRewriter` trait with lopdf. Parsing and
//! serializing are CPU-bound, so the work runs on tokio's blocking pool and the
//! async executor is never stalled by a large document.

use bytes::Bytes;
use lopdf::xref::XrefType;
use lopdf::{Document, Object, ObjectId, Stream};
use std::future::Future;
use std::io::Cursor;
use tracing::{debug, instrument};

use pdfpress_domain::{compression::CompressionError, ports::DocumentRewriter};

/// Trailer keys that only make sense on a previous revision or an xref stream
const XREF_STREAM_TRAILER_KEYS: [&[u8]; 8] = [
    b"Prev",
    b"XRefStm",
    b"Type",
    b"W",
    b"Index",
    b"Length",
    b"Filter",
    b"DecodeParms",
];

/// Knobs for the lopdf rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Flate-compress every stream that is not compressed yet
    pub compress_streams: bool,
    /// Drop objects unreachable from the trailer and zero-length streams, then renumber
    pub prune_unreferenced: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            compress_streams: true,
            prune_unreferenced: true,
        }
    }
}

/// lopdf-based implementation of the DocumentRewriter port
///
/// The output is always one full revision: object streams and cross-reference
/// streams from the input are dissolved, and the trailer no longer points at
/// any previous revision.
#[derive(Debug, Clone, Default)]
pub struct LopdfRewriter {
    options: RewriteOptions,
}

impl LopdfRewriter {
    /// Create a new rewriter with the given options
    pub fn new(options: RewriteOptions) -> Self {
        Self { options }
    }

    /// Get the rewrite options
    pub fn options(&self) -> RewriteOptions {
        self.options
    }

    /// Rewrite a document on the current thread
    ///
    /// # Errors
    ///
    /// - `CompressionError::MalformedDocument` if the input is empty or not a PDF
    /// - `CompressionError::Internal` if serialization fails
    pub fn rewrite(&self, document: &[u8]) -> Result<Vec<u8>, CompressionError> {
        rewrite_document(document, self.options)
    }
}

impl DocumentRewriter for LopdfRewriter {
    fn transform(
        &self,
        document: Bytes,
    ) -> impl Future<Output = Result<Vec<u8>, CompressionError>> + Send {
        let options = self.options;

        async move {
            tokio::task::spawn_blocking(move || rewrite_document(&document, options))
                .await
                .map_err(|err| CompressionError::internal(format!("rewrite task failed: {err}")))?
        }
    }
}

#[instrument(skip(document), fields(size = document.len()))]
fn rewrite_document(
    document: &[u8],
    options: RewriteOptions,
) -> Result<Vec<u8>, CompressionError> {
    if document.is_empty() {
        return Err(CompressionError::malformed_document("document is empty"));
    }

    let mut doc = Document::load_mem(document)
        .map_err(|err| CompressionError::malformed_document(format!("failed to parse PDF: {err}")))?;

    if doc.trailer.get(b"Root").is_err() {
        return Err(CompressionError::malformed_document(
            "document has no catalog",
        ));
    }

    let loaded_objects = doc.objects.len();
    let dissolved = dissolve_structural_streams(&mut doc);

    if options.prune_unreferenced {
        let pruned = doc.prune_objects();
        let empty = doc.delete_zero_length_streams();
        doc.renumber_objects();
        debug!(
            pruned = pruned.len(),
            empty_streams = empty.len(),
            "Pruned unreferenced objects"
        );
    }

    if options.compress_streams {
        doc.compress();
    }

    // One full revision with a classic table: nothing may point back at an
    // earlier revision, and keys inherited from an xref stream dictionary go
    doc.reference_table.cross_reference_type = XrefType::CrossReferenceTable;
    for key in XREF_STREAM_TRAILER_KEYS {
        doc.trailer.remove(key);
    }

    let mut output = Cursor::new(Vec::new());
    doc.save_to(&mut output)
        .map_err(|err| CompressionError::internal(format!("failed to save PDF: {err}")))?;
    let output = output.into_inner();

    debug!(
        loaded_objects,
        dissolved,
        written_objects = doc.objects.len(),
        output_size = output.len(),
        "Rewrote document"
    );
    Ok(output)
}

/// Remove object-stream and cross-reference-stream containers left from loading
///
/// Their contents have already been expanded into individual objects.
fn dissolve_structural_streams(doc: &mut Document) -> usize {
    let containers: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if is_structural_stream(stream) => Some(*id),
            _ => None,
        })
        .collect();

    for id in &containers {
        doc.objects.remove(id);
    }
    containers.len()
}

fn is_structural_stream(stream: &Stream) -> bool {
    match stream.dict.get(b"Type").and_then(Object::as_name) {
        Ok(name) => name == b"ObjStm" || name == b"XRef",
        Err(_) => false,
    }
}
