// handlers/protected/candidates.rs - /api/candidates handlers

use axum::extract::Path;
use axum::Extension;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::candidates::{Candidate, CandidateService};

/// GET /api/candidates
pub async fn candidates_list(Extension(session): Extension<CurrentSession>) -> ApiResult<Vec<Candidate>> {
    let service = CandidateService::new().await?;
    Ok(ApiResponse::success(service.list(session.get()).await?))
}

/// GET /api/candidates/:id - includes answers
pub async fn candidates_get(Extension(session): Extension<CurrentSession>, Path(id): Path<Uuid>) -> ApiResult<Candidate> {
    let service = CandidateService::new().await?;
    Ok(ApiResponse::success(service.get(session.get(), id).await?))
}
