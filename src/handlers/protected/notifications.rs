// handlers/protected/notifications.rs - /api/notifications handlers

use axum::extract::{Path, Query};
use axum::Extension;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::Notification;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::notifications::{NotificationQuery, NotificationScope, NotificationService};

#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    #[serde(default)]
    pub scope: NotificationScope,
}

/// GET /api/notifications/unread-count?scope=me|all
pub async fn notifications_unread_count(
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<ScopeQuery>,
) -> ApiResult<Value> {
    let service = NotificationService::new().await?;
    Ok(ApiResponse::success(service.unread_count(session.get(), query.scope).await?))
}

/// GET /api/notifications
pub async fn notifications_list(
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Vec<Notification>> {
    let service = NotificationService::new().await?;
    Ok(ApiResponse::success(service.list(session.get(), &query).await?))
}

/// POST /api/notifications/:id/read
pub async fn notifications_mark_read(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let service = NotificationService::new().await?;
    Ok(ApiResponse::success(service.mark_read(session.get(), id).await?))
}

/// POST /api/notifications/read-all
pub async fn notifications_mark_all_read(Extension(session): Extension<CurrentSession>) -> ApiResult<Value> {
    let service = NotificationService::new().await?;
    Ok(ApiResponse::success(service.mark_all_read(session.get()).await?))
}
