// handlers/protected/auth.rs - /api/auth/me and /api/permissions

use axum::Extension;

use crate::authz::{authorize, descriptor_for, ops, PermissionDescriptor, Session};
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};

/// GET /api/auth/me - `null` data when there is no staff session
pub async fn auth_me(Extension(session): Extension<CurrentSession>) -> ApiResult<Option<Session>> {
    Ok(ApiResponse::success(session.0))
}

/// GET /api/permissions - the caller's generated descriptor
pub async fn permissions_get(Extension(session): Extension<CurrentSession>) -> ApiResult<PermissionDescriptor> {
    let session = authorize(session.get(), &ops::VIEW_PERMISSIONS)?;
    Ok(ApiResponse::success(descriptor_for(session.role)))
}
