// handlers/public/upload.rs - POST /api/upload/video handler

use axum::extract::Multipart;

use crate::config::config;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::uploads::{store_video, StoredUpload};

/// Multipart field `file`; other fields are ignored
pub async fn upload_video(mut multipart: Multipart) -> ApiResult<StoredUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!("Upload aborted: {}", e);
            ApiError::payload_too_large("Upload exceeds the allowed size")
        })?;

        let cfg = config();
        let stored = store_video(
            &cfg.uploads,
            &cfg.api.public_base_url,
            content_type.as_deref(),
            file_name.as_deref(),
            &bytes,
        )
        .await?;
        return Ok(ApiResponse::created(stored));
    }

    Err(ApiError::bad_request("No file uploaded"))
}
