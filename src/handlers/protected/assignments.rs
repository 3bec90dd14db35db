// handlers/protected/assignments.rs - /api/assignments handlers

use axum::extract::Path;
use axum::{Extension, Json};
use serde_json::Value;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::assignments::{AssignmentService, AssignmentView, CreateAssignment};

/// POST /api/assignments
pub async fn assignments_create(
    Extension(session): Extension<CurrentSession>,
    Json(body): Json<CreateAssignment>,
) -> ApiResult<AssignmentView> {
    let service = AssignmentService::new().await?;
    Ok(ApiResponse::created(service.create(session.get(), &body).await?))
}

/// GET /api/assignments/:id
pub async fn assignments_get(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
) -> ApiResult<AssignmentView> {
    let service = AssignmentService::new().await?;
    Ok(ApiResponse::success(service.get(session.get(), id).await?))
}

/// DELETE /api/assignments/:id
pub async fn assignments_delete(Extension(session): Extension<CurrentSession>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let service = AssignmentService::new().await?;
    Ok(ApiResponse::success(service.delete(session.get(), id).await?))
}
