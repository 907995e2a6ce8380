//! API routes

pub mod compression;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{dto::compression::CompressForm, handlers, AppState};

/// Room left for multipart boundaries and part headers on top of the document
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::compression::compress_handler,
        health_handler
    ),
    components(
        schemas(CompressForm)
    ),
    tags(
        (name = "compression", description = "PDF compression endpoints"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "PdfPress API",
        version = "0.1.0",
        description = "Upload a PDF and receive a rewritten, smaller copy",
        contact(
            name = "PdfPress Team"
        )
    )
)]
pub struct ApiDoc;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state
        .compression_service
        .config()
        .max_document_size
        .saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(compression::routes().layer(DefaultBodyLimit::max(body_limit)))
        .route("/health", axum::routing::get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    ),
    tag = "health"
)]
async fn health_handler() -> &'static str {
    "OK"
}
