// handlers/protected/dashboard.rs - /api/dashboard/* handlers

use axum::extract::Query;
use axum::Extension;
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::candidates::{Candidate, CandidateService};
use crate::services::dashboard::{DashboardService, DashboardStats};

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: i64,
}

fn default_recent_limit() -> i64 {
    5
}

/// GET /api/dashboard/stats
pub async fn dashboard_stats(Extension(session): Extension<CurrentSession>) -> ApiResult<DashboardStats> {
    let service = DashboardService::new().await?;
    Ok(ApiResponse::success(service.stats(session.get()).await?))
}

/// GET /api/dashboard/recent-candidates?limit=5
pub async fn recent_candidates(
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Vec<Candidate>> {
    let service = CandidateService::new().await?;
    Ok(ApiResponse::success(service.recent(session.get(), query.limit).await?))
}
