// handlers/protected/applications.rs - /api/applications/* handlers

use axum::extract::Path;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::database::models::{HrEvaluation, Interview};
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::assignments::{AssignmentService, AssignmentView};
use crate::services::evaluations::{EvaluationService, HrEvaluationInput};
use crate::services::interviews::InterviewService;
use crate::services::progress::{IncompleteReport, ProgressService};

/// GET /api/applications/incomplete
pub async fn incomplete_list(Extension(session): Extension<CurrentSession>) -> ApiResult<IncompleteReport> {
    let service = ProgressService::new().await?;
    Ok(ApiResponse::success(service.list_incomplete(session.get()).await?))
}

/// GET /api/applications/:id/interviews - newest first
pub async fn application_interviews(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Interview>> {
    let service = InterviewService::new().await?;
    Ok(ApiResponse::success(service.list_for_application(session.get(), id).await?))
}

/// GET /api/applications/:id/assignments - oldest first
pub async fn application_assignments(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<AssignmentView>> {
    let service = AssignmentService::new().await?;
    Ok(ApiResponse::success(service.list_for_application(session.get(), id).await?))
}

/// GET /api/applications/:id/hr-evaluation
pub async fn hr_evaluation_get(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
) -> ApiResult<Option<HrEvaluation>> {
    let service = EvaluationService::new().await?;
    Ok(ApiResponse::success(service.get_hr(session.get(), id).await?))
}

/// PUT /api/applications/:id/hr-evaluation
pub async fn hr_evaluation_put(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
    Json(body): Json<HrEvaluationInput>,
) -> ApiResult<HrEvaluation> {
    let service = EvaluationService::new().await?;
    Ok(ApiResponse::success(service.upsert_hr(session.get(), id, &body).await?))
}
