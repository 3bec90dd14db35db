// handlers/elevated/activity.rs - GET /api/activity handler

use axum::extract::Query;
use axum::Extension;

use crate::database::models::ActivityEntry;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::activity::{ActivityQuery, ActivityService};

/// Filters: user_id, action (substring), target_type, limit
pub async fn activity_list(
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Vec<ActivityEntry>> {
    let service = ActivityService::new().await?;
    Ok(ApiResponse::success(service.list(session.get(), &query).await?))
}
