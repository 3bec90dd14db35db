use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

use crate::auth::validate_jwt;
use crate::authz::{require_staff, resolve_session, Session};
use crate::database::DatabaseManager;
use crate::error::ApiError;

/// Request-scoped session, `None` when the caller is anonymous or unrecognized.
#[derive(Clone, Debug, Default)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    pub fn get(&self) -> Option<&Session> {
        self.0.as_ref()
    }
}

/// Resolves the caller's session and injects it into the request.
///
/// Never rejects: missing or invalid credentials produce an empty session
/// and the gates downstream decide what that means.
pub async fn session_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let session = match extract_jwt_from_headers(&headers) {
        Ok(token) => resolve_from_token(&token).await,
        Err(msg) => {
            tracing::trace!("No identity on request: {}", msg);
            None
        }
    };

    request.extensions_mut().insert(CurrentSession(session));
    next.run(request).await
}

async fn resolve_from_token(token: &str) -> Option<Session> {
    let claims = match validate_jwt(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Rejected identity token: {}", e);
            return None;
        }
    };

    let pool = match DatabaseManager::pool().await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!("Session lookup skipped, database unavailable: {}", e);
            return None;
        }
    };

    resolve_session(&pool, claims.sub).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Route layer for the staff and admin groups. Refuses callers without a
/// staff session before any handler builds its database pool; the finer
/// gates still run inside each service.
pub async fn require_staff_session(request: Request, next: Next) -> Result<Response, ApiError> {
    let session = request.extensions().get::<CurrentSession>().and_then(CurrentSession::get);
    require_staff(session)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_other_schemes_and_blanks() {
        let mut headers = HeaderMap::new();
        assert!(extract_jwt_from_headers(&headers).is_err());
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(extract_jwt_from_headers(&headers).is_err());
        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_jwt_from_headers(&headers).is_err());
    }
}
