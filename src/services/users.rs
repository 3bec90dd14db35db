use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::authz::{authorize, ops, Role, Session};
use crate::database::models::User;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;

const USER_COLUMNS: &str = "id, email, name, role, organization_id, is_active, last_sign_in_at, created_at";

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: String,
}

impl RoleChange {
    pub fn parse(&self) -> Result<Role, ApiError> {
        self.role.parse::<Role>().map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    /// Admins see the members of their own organization
    pub async fn list(&self, session: Option<&Session>) -> Result<Vec<User>, ApiError> {
        let session = authorize(session, &ops::LIST_USERS)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users WHERE TRUE", USER_COLUMNS));
        session.org_scope().push_filter(&mut qb, "organization_id");
        qb.push(" ORDER BY created_at DESC");

        Ok(qb.build_query_as::<User>().fetch_all(&self.pool).await?)
    }

    pub async fn set_status(&self, session: Option<&Session>, id: Uuid, change: &StatusChange) -> Result<User, ApiError> {
        let session = authorize(session, &ops::SET_USER_STATUS)?;
        if id == session.user_id && !change.is_active {
            return Err(ApiError::bad_request("You cannot deactivate your own account"));
        }

        let sql = format!("UPDATE users SET is_active = $1 WHERE id = $2 RETURNING {}", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(change.is_active)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        tracing::info!("User {} active={} (by {})", id, change.is_active, session.user_id);
        Ok(user)
    }

    pub async fn set_role(&self, session: Option<&Session>, id: Uuid, change: &RoleChange) -> Result<User, ApiError> {
        let session = authorize(session, &ops::SET_USER_ROLE)?;
        let role = change.parse()?;

        let sql = format!("UPDATE users SET role = $1 WHERE id = $2 RETURNING {}", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(role.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        tracing::info!("User {} is now {} (by {})", id, role, session.user_id);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_are_bad_requests() {
        let err = RoleChange { role: "owner".into() }.parse().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Unknown role: owner");
        assert_eq!(RoleChange { role: "reviewer".into() }.parse().unwrap(), Role::Reviewer);
    }
}
