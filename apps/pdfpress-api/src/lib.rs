//! PdfPress API - PDF compression over HTTP
//!
//! Accepts a multipart upload on `POST /compress`, rewrites the document with
//! lopdf and streams the result back as an attachment. Every file written for a
//! request is removed once the response body has been sent, has failed, or has
//! been abandoned by the client.

pub mod config;
pub mod delivery;
pub mod dto;
pub mod handlers;
pub mod routes;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use pdfpress_domain::CompressionService;
use pdfpress_fs::FsArtifactStore;
use pdfpress_lopdf::LopdfRewriter;

pub use config::ServerConfig;
pub use routes::create_router;

/// The compression service as wired for this binary
pub type Service = CompressionService<FsArtifactStore, LopdfRewriter>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub compression_service: Arc<Service>,
}

impl AppState {
    pub fn new(service: Service) -> Self {
        Self {
            compression_service: Arc::new(service),
        }
    }
}

/// Build the storage adapter, rewriter and service from configuration
///
/// Creates both storage roots and purges artifacts left behind by a previous
/// process before any request is accepted.
pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let store = FsArtifactStore::new(config.storage_roots());
    let purged = store
        .prepare()
        .await
        .context("failed to prepare storage roots")?;
    if purged > 0 {
        info!(purged, "Removed stale artifacts from a previous run");
    }

    let rewriter = LopdfRewriter::new(config.rewrite);
    let service = CompressionService::new(Arc::new(store), rewriter, config.compression_config());

    Ok(AppState::new(service))
}
