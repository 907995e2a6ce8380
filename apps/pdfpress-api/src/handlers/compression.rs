//! Compression handler

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use pdfpress_domain::{CompressionError, UploadRequest};

use crate::{delivery, dto::compression::CompressForm, AppState};

/// Multipart field carrying the document
pub const UPLOAD_FIELD: &str = "pdf";

/// Handle compression requests
#[utoipa::path(
    post,
    path = "/compress",
    request_body(content = CompressForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Rewritten document as an attachment", content_type = "application/pdf"),
        (status = 400, description = "Bad request - not multipart or no `pdf` field", body = String),
        (status = 413, description = "Document too large", body = String),
        (status = 422, description = "Upload is not a readable PDF", body = String),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "compression"
)]
pub async fn compress_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let declared_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let service = &state.compression_service;

    let upload = match read_upload(multipart, declared_length, service.config().max_document_size)
        .await
    {
        Ok(upload) => upload,
        Err(err) => {
            warn!(error = %err, "Rejected upload");
            return error_response(&err);
        }
    };

    debug!(
        request_id = %upload.request_id(),
        original_filename = %upload.original_filename(),
        declared_length = ?upload.declared_length(),
        "Decoded multipart upload"
    );

    match service.compress(upload).await {
        Ok(document) => delivery::deliver(service.store(), document).await,
        Err(err) => error_response(&err),
    }
}

/// Pull the `pdf` field out of the form, skipping any others
async fn read_upload(
    mut multipart: Multipart,
    declared_length: Option<u64>,
    max: u64,
) -> Result<UploadRequest, CompressionError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, declared_length, max))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }

        let filename = field.file_name().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|err| multipart_error(err, declared_length, max))?;
        return Ok(UploadRequest::new(filename.as_deref(), data, declared_length));
    }

    Err(CompressionError::bad_request(format!(
        "no `{UPLOAD_FIELD}` field in the form"
    )))
}

fn multipart_error(err: MultipartError, declared_length: Option<u64>, max: u64) -> CompressionError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        CompressionError::document_too_large(declared_length.unwrap_or(max.saturating_add(1)), max)
    } else {
        CompressionError::bad_request(format!("failed to read multipart body: {err}"))
    }
}

/// Map a pipeline error to a plain-text response
///
/// Client errors carry their message. Server errors get a fixed message so
/// storage paths never reach the caller.
pub fn error_response(err: &CompressionError) -> Response {
    let status = match err {
        CompressionError::BadRequest(_) => StatusCode::BAD_REQUEST,
        CompressionError::MalformedDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CompressionError::DocumentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        CompressionError::Storage(_)
        | CompressionError::Transport(_)
        | CompressionError::Config(_)
        | CompressionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if err.is_client_error() {
        err.to_string()
    } else {
        "Error compressing PDF, please try again".to_string()
    };

    (status, message).into_response()
}
