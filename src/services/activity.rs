use axum::http::HeaderMap;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::authz::{authorize, ops, Session};
use crate::database::models::ActivityEntry;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

/// Where a request came from, as reported by the proxy headers.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestOrigin {
    /// First hop of `x-forwarded-for`, falling back to `x-real-ip`
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        let ip_address = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .or_else(|| header("x-real-ip"))
            .map(str::to_string);
        Self {
            ip_address,
            user_agent: header("user-agent").map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub action: &'static str,
    pub target: Option<String>,
    pub target_type: &'static str,
    pub description: String,
}

/// Append an `active_log` row. Failures are logged and swallowed.
pub async fn log_activity(pool: &PgPool, session: &Session, origin: &RequestOrigin, activity: NewActivity) {
    let inserted = sqlx::query(
        "INSERT INTO active_log (user_id, user_name, user_role, action, target, target_type, description, ip_address, user_agent) \
         SELECT $1, (SELECT COALESCE(name, email) FROM users WHERE id = $1), $2, $3, $4, $5, $6, $7, $8",
    )
    .bind(session.user_id)
    .bind(session.role.as_str())
    .bind(activity.action)
    .bind(&activity.target)
    .bind(activity.target_type)
    .bind(&activity.description)
    .bind(&origin.ip_address)
    .bind(&origin.user_agent)
    .execute(pool)
    .await;

    if let Err(e) = inserted {
        tracing::warn!("Activity '{}' not logged: {}", activity.action, e);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityQuery {
    pub user_id: Option<Uuid>,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub limit: Option<i64>,
}

impl ActivityQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// `%`, `_` and `\` are literal in the action filter
fn like_pattern(raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

pub struct ActivityService {
    pool: PgPool,
}

impl ActivityService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    /// Admins see activity by members of their own organization
    pub async fn list(&self, session: Option<&Session>, query: &ActivityQuery) -> Result<Vec<ActivityEntry>, ApiError> {
        let session = authorize(session, &ops::LIST_ACTIVITY)?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT l.id, l.user_id, l.user_name, l.user_role, l.action, l.target, l.target_type, \
             l.description, l.ip_address, l.user_agent, l.created_at \
             FROM active_log l LEFT JOIN users u ON u.id = l.user_id WHERE TRUE",
        );
        session.org_scope().push_filter(&mut qb, "u.organization_id");
        if let Some(user_id) = query.user_id {
            qb.push(" AND l.user_id = ").push_bind(user_id);
        }
        if let Some(action) = query.action.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            qb.push(" AND l.action ILIKE ").push_bind(like_pattern(action));
        }
        if let Some(target_type) = query.target_type.as_deref().filter(|t| !t.is_empty()) {
            qb.push(" AND l.target_type = ").push_bind(target_type.to_string());
        }
        qb.push(" ORDER BY l.created_at DESC LIMIT ").push_bind(query.limit());

        Ok(qb.build_query_as::<ActivityEntry>().fetch_all(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_filter_is_a_literal_substring() {
        assert_eq!(like_pattern("job.create"), "%job.create%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn origin_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        headers.insert("user-agent", "curl/8.0".parse().unwrap());
        let origin = RequestOrigin::from_headers(&headers);
        assert_eq!(origin.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(origin.user_agent.as_deref(), Some("curl/8.0"));
        assert!(RequestOrigin::from_headers(&HeaderMap::new()).ip_address.is_none());
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(ActivityQuery::default().limit(), 100);
        let q = ActivityQuery { limit: Some(0), ..Default::default() };
        assert_eq!(q.limit(), 1);
        let q = ActivityQuery { limit: Some(10_000), ..Default::default() };
        assert_eq!(q.limit(), 500);
    }
}
