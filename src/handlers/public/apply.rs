// handlers/public/apply.rs - /apply/* handlers

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::applications::{
    ApplicationService, ApplicationStarted, ApplicationSubmitted, ApplyForm, BeginApplication, ProgressUpdate,
    SubmitApplication,
};
use crate::state::AppState;

/// GET /apply/:job_id - job details and normalized questions
pub async fn apply_form(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> ApiResult<ApplyForm> {
    let service = ApplicationService::new(state.mailer).await?;
    Ok(ApiResponse::success(service.get_job_for_application(job_id).await?))
}

/// POST /apply/:job_id/begin
pub async fn apply_begin(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<BeginApplication>,
) -> ApiResult<ApplicationStarted> {
    let service = ApplicationService::new(state.mailer).await?;
    Ok(ApiResponse::created(service.begin(job_id, &body).await?))
}

/// POST /apply/:job_id/submit
pub async fn apply_submit(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<SubmitApplication>,
) -> ApiResult<ApplicationSubmitted> {
    let service = ApplicationService::new(state.mailer).await?;
    Ok(ApiResponse::created(service.submit(job_id, &body).await?))
}

/// POST /apply/applications/:id/progress
pub async fn apply_progress(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(body): Json<ProgressUpdate>,
) -> ApiResult<Value> {
    let service = ApplicationService::new(state.mailer).await?;
    Ok(ApiResponse::success(service.record_progress(application_id, &body).await?))
}
