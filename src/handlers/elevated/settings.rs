// handlers/elevated/settings.rs - /api/settings handlers

use axum::{Extension, Json};

use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::settings::{SettingsService, SystemSettings};

/// GET /api/settings
pub async fn settings_get(Extension(session): Extension<CurrentSession>) -> ApiResult<SystemSettings> {
    let service = SettingsService::new().await?;
    Ok(ApiResponse::success(service.get(session.get()).await?))
}

/// PUT /api/settings - super-admin only
pub async fn settings_put(
    Extension(session): Extension<CurrentSession>,
    Json(body): Json<SystemSettings>,
) -> ApiResult<SystemSettings> {
    let service = SettingsService::new().await?;
    Ok(ApiResponse::success(service.update(session.get(), &body).await?))
}
