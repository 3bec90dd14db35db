// handlers/elevated/users.rs - /api/users handlers

use axum::extract::Path;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::users::{RoleChange, StatusChange, UserService};

/// GET /api/users
pub async fn users_list(Extension(session): Extension<CurrentSession>) -> ApiResult<Vec<User>> {
    let service = UserService::new().await?;
    Ok(ApiResponse::success(service.list(session.get()).await?))
}

/// PUT /api/users/:id/status
pub async fn users_set_status(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> ApiResult<User> {
    let service = UserService::new().await?;
    Ok(ApiResponse::success(service.set_status(session.get(), id, &body).await?))
}

/// PUT /api/users/:id/role
pub async fn users_set_role(
    Extension(session): Extension<CurrentSession>,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleChange>,
) -> ApiResult<User> {
    let service = UserService::new().await?;
    Ok(ApiResponse::success(service.set_role(session.get(), id, &body).await?))
}
