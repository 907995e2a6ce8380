//! Upload with progress reporting
//!
//! The file is streamed from disk into the multipart body. Every chunk handed
//! to reqwest passes through [`track_progress`], which turns it into a
//! [`ProgressEvent`] on an unbounded channel. A slow or absent listener never
//! stalls the upload.

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument, warn};

use pdfpress_domain::compression::{output_filename, sanitize_filename};
use pdfpress_domain::{CompressionResult, ProgressEvent, UploadProgress};

/// Multipart field the server reads the document from
pub const UPLOAD_FIELD: &str = "pdf";

/// Count bytes as they leave `stream` and publish a progress event per chunk
///
/// Errors pass through untouched and are not counted.
pub fn track_progress<St>(
    stream: St,
    total_bytes: u64,
    events: UnboundedSender<ProgressEvent>,
) -> impl Stream<Item = io::Result<Bytes>>
where
    St: Stream<Item = io::Result<Bytes>>,
{
    let mut progress = UploadProgress::new(total_bytes);

    stream.map(move |chunk| {
        if let Ok(bytes) = &chunk {
            // Listener may have gone away; the upload carries on regardless
            let _ = events.send(progress.record(bytes.len() as u64));
        }
        chunk
    })
}

/// A compressed document received from the server
#[derive(Debug)]
pub struct CompressionOutcome {
    /// Name to save the document under, `compressed_<original>`
    pub filename: String,
    /// The compressed document
    pub data: Bytes,
    /// Sizes measured on this side of the wire
    pub result: CompressionResult,
}

impl CompressionOutcome {
    /// Write the document into `dir`, creating it if needed
    pub async fn save(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.data)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        info!(path = %path.display(), size = self.data.len(), "Saved compressed document");
        Ok(path)
    }
}

/// HTTP client for `POST /compress`
#[derive(Debug, Clone)]
pub struct CompressClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CompressClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/compress", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload `path` and collect the compressed document
    ///
    /// The reduction is computed from the file's size on disk and the length
    /// of the body actually received, not from server-reported headers.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, the request cannot be sent, or the
    /// server answers with a non-success status (its message is included).
    #[instrument(skip(self, events), fields(endpoint = %self.endpoint))]
    pub async fn compress_file(
        &self,
        path: &Path,
        events: UnboundedSender<ProgressEvent>,
    ) -> Result<CompressionOutcome> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        let total_bytes = file
            .metadata()
            .await
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();

        let filename = sanitize_filename(
            &path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        debug!(filename = %filename, total_bytes, "Uploading document");

        let body = reqwest::Body::wrap_stream(track_progress(
            ReaderStream::new(file),
            total_bytes,
            events,
        ));
        let part = Part::stream_with_length(body, total_bytes)
            .file_name(filename.clone())
            .mime_str("application/pdf")
            .context("invalid part content type")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            bail!("server rejected the document ({status}): {}", message.trim());
        }

        let reported = response
            .headers()
            .get("x-compressed-size")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let data = response
            .bytes()
            .await
            .context("connection lost while receiving the compressed document")?;

        let received = data.len() as u64;
        if let Some(reported) = reported.filter(|reported| *reported != received) {
            warn!(reported, received, "Server-reported size differs from received body");
        }

        Ok(CompressionOutcome {
            filename: output_filename(&filename),
            result: CompressionResult::new(total_bytes, received),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn chunks(sizes: &[usize]) -> impl Stream<Item = io::Result<Bytes>> + Unpin {
        futures::stream::iter(
            sizes
                .iter()
                .map(|size| Ok(Bytes::from(vec![0u8; *size])))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_progress_follows_chunks() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let forwarded: Vec<_> = track_progress(chunks(&[300, 300, 400]), 1000, tx)
            .collect()
            .await;

        assert_eq!(forwarded.len(), 3);
        let mut percentages = Vec::new();
        while let Some(event) = rx.recv().await {
            percentages.push(event.percentage);
        }
        assert_eq!(percentages, vec![30, 60, 100]);
    }

    #[tokio::test]
    async fn test_errors_pass_through_uncounted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"abcd")),
            Err(io::Error::new(io::ErrorKind::Other, "disk gone")),
        ]);

        let forwarded: Vec<_> = track_progress(stream, 8, tx).collect().await;

        assert!(forwarded[1].is_err());
        assert_eq!(rx.recv().await.unwrap().bytes_transferred, 4);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_listener_does_not_stop_upload() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let forwarded: Vec<_> = track_progress(chunks(&[10, 10]), 20, tx).collect().await;

        assert_eq!(forwarded.len(), 2);
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = CompressClient::new("http://localhost:5000/").unwrap();

        assert_eq!(client.endpoint(), "http://localhost:5000/compress");
    }
}
