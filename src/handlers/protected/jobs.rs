// handlers/protected/jobs.rs - /api/jobs and /api/organization/users

use axum::extract::{Path, Query};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{JobForm, User};
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::activity::RequestOrigin;
use crate::services::jobs::{JobDetail, JobInput, JobService, JobSummary, OrganizationUsersQuery};

/// GET /api/jobs
pub async fn jobs_list(Extension(session): Extension<CurrentSession>) -> ApiResult<Vec<JobSummary>> {
    let service = JobService::new().await?;
    Ok(ApiResponse::success(service.list(session.get()).await?))
}

/// GET /api/jobs/:id
pub async fn jobs_get(Extension(session): Extension<CurrentSession>, Path(id): Path<Uuid>) -> ApiResult<JobDetail> {
    let service = JobService::new().await?;
    Ok(ApiResponse::success(service.get(session.get(), id).await?))
}

/// POST /api/jobs
pub async fn jobs_create(
    Extension(session): Extension<CurrentSession>,
    headers: HeaderMap,
    Json(body): Json<JobInput>,
) -> ApiResult<JobDetail> {
    let service = JobService::new().await?;
    let origin = RequestOrigin::from_headers(&headers);
    Ok(ApiResponse::created(service.create(session.get(), &origin, &body).await?))
}

/// PUT /api/jobs/:id
pub async fn jobs_update(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<JobInput>,
) -> ApiResult<JobDetail> {
    let service = JobService::new().await?;
    let origin = RequestOrigin::from_headers(&headers);
    Ok(ApiResponse::success(service.update(session.get(), &origin, id, &body).await?))
}

/// DELETE /api/jobs/:id
pub async fn jobs_delete(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<Value> {
    let service = JobService::new().await?;
    let origin = RequestOrigin::from_headers(&headers);
    Ok(ApiResponse::success(service.delete(session.get(), &origin, id).await?))
}

/// POST /api/jobs/:id/close
pub async fn jobs_close(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<JobForm> {
    let service = JobService::new().await?;
    let origin = RequestOrigin::from_headers(&headers);
    Ok(ApiResponse::success(service.close(session.get(), &origin, id).await?))
}

/// GET /api/organization/users
pub async fn organization_users(
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<OrganizationUsersQuery>,
) -> ApiResult<Vec<User>> {
    let service = JobService::new().await?;
    Ok(ApiResponse::success(service.organization_users(session.get(), &query).await?))
}
