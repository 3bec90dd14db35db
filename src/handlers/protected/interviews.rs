// handlers/protected/interviews.rs - /api/interviews handlers

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::Interview;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::interviews::{CreateInterview, InterviewService};
use crate::state::AppState;

/// POST /api/interviews
pub async fn interviews_create(
    Extension(session): Extension<CurrentSession>,
    Json(body): Json<CreateInterview>,
) -> ApiResult<Interview> {
    let service = InterviewService::new().await?;
    Ok(ApiResponse::created(service.create(session.get(), &body).await?))
}

/// GET /api/interviews/:id
pub async fn interviews_get(Extension(session): Extension<CurrentSession>, Path(id): Path<Uuid>) -> ApiResult<Interview> {
    let service = InterviewService::new().await?;
    Ok(ApiResponse::success(service.get(session.get(), id).await?))
}

/// DELETE /api/interviews/:id
pub async fn interviews_delete(Extension(session): Extension<CurrentSession>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let service = InterviewService::new().await?;
    Ok(ApiResponse::success(service.delete(session.get(), id).await?))
}

/// POST /api/interviews/:id/analyze
pub async fn interviews_analyze(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
) -> ApiResult<Interview> {
    let service = InterviewService::new().await?;
    Ok(ApiResponse::success(service.analyze(session.get(), &state.ai, id).await?))
}
