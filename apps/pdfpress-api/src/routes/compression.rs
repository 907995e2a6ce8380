//! Compression routes

use axum::{routing::post, Router};

use crate::{handlers::compression::compress_handler, AppState};

/// Create compression routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/compress", post(compress_handler))
}
