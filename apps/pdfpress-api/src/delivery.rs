//! Streaming delivery of rewritten documents
//!
//! The response body reads the rewritten artifact from disk chunk by chunk.
//! The [`CompressedDocument`] travels inside the body stream, so the request's
//! artifacts live exactly as long as the body does:
//!
//! - the recorded size has been yielded: the run completes
//! - a read fails mid-stream: the run fails with a transport error
//! - the body is dropped early (client went away): the document's drop marks
//!   the run failed
//!
//! Both artifacts are released in all three cases.

use axum::{
    body::Body,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::ReaderStream;

use pdfpress_domain::compression::PipelineState;
use pdfpress_domain::{ports::ArtifactStore, CompressedDocument, CompressionError};
use pdfpress_fs::FsArtifactStore;

use crate::handlers::compression::error_response;

pub const X_ORIGINAL_SIZE: HeaderName = HeaderName::from_static("x-original-size");
pub const X_COMPRESSED_SIZE: HeaderName = HeaderName::from_static("x-compressed-size");
pub const X_REDUCTION_PERCENT: HeaderName = HeaderName::from_static("x-reduction-percent");

/// Build the attachment response for a rewritten document
///
/// If the artifact cannot be opened or the headers cannot be built, the
/// document is failed here and a 500 goes out instead.
pub async fn deliver(
    store: &FsArtifactStore,
    document: CompressedDocument<FsArtifactStore>,
) -> Response {
    let headers = match attachment_headers(&document) {
        Ok(headers) => headers,
        Err(err) => return fail_before_body(document, err),
    };

    let file = match store.open(document.output()).await {
        Ok(file) => file,
        Err(err) => return fail_before_body(document, err),
    };

    let body = Body::from_stream(DeliveryStream::new(ReaderStream::new(file), document));
    (StatusCode::OK, headers, body).into_response()
}

fn fail_before_body<S: ArtifactStore>(
    document: CompressedDocument<S>,
    err: CompressionError,
) -> Response {
    let response = error_response(&err);
    document.fail(err);
    response
}

/// Headers describing the attachment and its size statistics
pub fn attachment_headers<S: ArtifactStore>(
    document: &CompressedDocument<S>,
) -> Result<HeaderMap, CompressionError> {
    let result = document.result();
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        document.filename()
    ))
    .map_err(|err| CompressionError::internal(format!("invalid filename header: {err}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(CONTENT_DISPOSITION, disposition);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(document.output().size()));
    headers.insert(X_ORIGINAL_SIZE, HeaderValue::from(result.original_size()));
    headers.insert(X_COMPRESSED_SIZE, HeaderValue::from(result.compressed_size()));
    headers.insert(
        X_REDUCTION_PERCENT,
        HeaderValue::from_str(&format!("{:.2}", result.reduction_percent()))
            .map_err(|err| CompressionError::internal(err.to_string()))?,
    );
    Ok(headers)
}

/// Body stream that settles its document when the stream ends or breaks
///
/// The document completes as soon as the announced length has been yielded.
/// With an explicit `Content-Length` hyper stops polling once that many bytes
/// are written and never asks for the end of the stream.
pub struct DeliveryStream<St, S: ArtifactStore> {
    inner: St,
    document: Option<CompressedDocument<S>>,
    expected: u64,
    delivered: u64,
    outcome: Option<PipelineState>,
}

impl<St, S: ArtifactStore> DeliveryStream<St, S> {
    pub fn new(inner: St, document: CompressedDocument<S>) -> Self {
        Self {
            inner,
            expected: document.output().size(),
            document: Some(document),
            delivered: 0,
            outcome: None,
        }
    }

    /// Terminal state recorded by this stream, if it settled the document itself
    ///
    /// `None` while delivery is in flight. A stream dropped before settling
    /// leaves the outcome to the document's own drop.
    pub fn outcome(&self) -> Option<PipelineState> {
        self.outcome
    }

    fn complete(&mut self) {
        if let Some(document) = self.document.take() {
            self.outcome = Some(document.complete());
        }
    }

    fn fail(&mut self, err: CompressionError) {
        if let Some(document) = self.document.take() {
            self.outcome = Some(document.fail(err));
        }
    }
}

impl<St, S> Stream for DeliveryStream<St, S>
where
    St: Stream<Item = io::Result<Bytes>> + Unpin,
    S: ArtifactStore,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);

        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                self.delivered += chunk.len() as u64;
                if self.delivered >= self.expected {
                    self.complete();
                }
            }
            Poll::Ready(Some(Err(err))) => {
                self.fail(CompressionError::transport(err.to_string()));
            }
            Poll::Ready(None) => {
                if self.delivered < self.expected {
                    let missing = self.expected - self.delivered;
                    self.fail(CompressionError::storage(format!(
                        "artifact ended {missing} bytes short of its recorded size"
                    )));
                } else {
                    self.complete();
                }
            }
            Poll::Pending => {}
        }

        polled
    }
}
