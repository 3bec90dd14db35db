// handlers/protected/evaluations.rs - GET /api/evaluations handler

use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::evaluations::{EvaluationService, EvaluationSummary};

pub async fn evaluations_list(Extension(session): Extension<CurrentSession>) -> ApiResult<Vec<EvaluationSummary>> {
    let service = EvaluationService::new().await?;
    Ok(ApiResponse::success(service.list(session.get()).await?))
}
