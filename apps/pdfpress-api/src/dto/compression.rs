//! Compression DTOs

use utoipa::ToSchema;

/// Multipart form accepted by `POST /compress`
#[derive(Debug, ToSchema)]
pub struct CompressForm {
    /// The PDF document to compress
    #[schema(value_type = String, format = Binary)]
    pub pdf: Vec<u8>,
}
