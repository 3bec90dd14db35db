use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::Role;

/// The caller's resolved identity for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
    pub organization_id: Option<Uuid>,
}

impl Session {
    pub fn org_scope(&self) -> OrgScope {
        if self.role.is_global() {
            return OrgScope::All;
        }
        match self.organization_id {
            Some(id) => OrgScope::Organization(id),
            None => OrgScope::Nothing,
        }
    }
}

/// Which job-form organizations a session may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgScope {
    All,
    Organization(Uuid),
    /// Org-scoped role without an organization sees nothing
    Nothing,
}

impl OrgScope {
    pub fn admits(&self, organization_id: Option<Uuid>) -> bool {
        match self {
            OrgScope::All => true,
            OrgScope::Organization(own) => organization_id == Some(*own),
            OrgScope::Nothing => false,
        }
    }

    /// Append `AND <column> ...` restricting rows to this scope.
    pub fn push_filter(&self, qb: &mut QueryBuilder<'_, Postgres>, column: &str) {
        match self {
            OrgScope::All => {}
            OrgScope::Organization(id) => {
                qb.push(format!(" AND {} = ", column));
                qb.push_bind(*id);
            }
            OrgScope::Nothing => {
                qb.push(" AND FALSE");
            }
        }
    }
}

/// Resolve the session for an authenticated identity.
///
/// Any lookup failure, unknown role or deactivated account yields `None`,
/// which every gate treats as unauthenticated.
pub async fn resolve_session(pool: &PgPool, user_id: Uuid) -> Option<Session> {
    let row = sqlx::query("SELECT role, organization_id, is_active FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await;

    let row = match row {
        Ok(Some(row)) => row,
        Ok(None) => {
            tracing::debug!("No profile row for identity {}", user_id);
            return None;
        }
        Err(e) => {
            tracing::warn!("Session lookup failed for {}: {}", user_id, e);
            return None;
        }
    };

    let role: String = row.try_get("role").ok()?;
    let organization_id: Option<Uuid> = row.try_get("organization_id").ok()?;
    let is_active: bool = row.try_get("is_active").unwrap_or(false);

    session_from_profile(user_id, &role, organization_id, is_active)
}

fn session_from_profile(
    user_id: Uuid,
    role: &str,
    organization_id: Option<Uuid>,
    is_active: bool,
) -> Option<Session> {
    if !is_active {
        tracing::debug!("Identity {} is deactivated", user_id);
        return None;
    }
    let role = role.parse::<Role>().ok()?;
    Some(Session { user_id, role, organization_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_has_no_session() {
        assert!(session_from_profile(Uuid::new_v4(), "candidate", None, true).is_none());
    }

    #[test]
    fn inactive_user_has_no_session() {
        assert!(session_from_profile(Uuid::new_v4(), "admin", Some(Uuid::new_v4()), false).is_none());
    }

    #[test]
    fn recognized_role_resolves() {
        let id = Uuid::new_v4();
        let org = Uuid::new_v4();
        let session = session_from_profile(id, "reviewer", Some(org), true).unwrap();
        assert_eq!(session, Session { user_id: id, role: Role::Reviewer, organization_id: Some(org) });
    }

    #[test]
    fn super_admin_scope_is_global() {
        let session = Session { user_id: Uuid::new_v4(), role: Role::SuperAdmin, organization_id: None };
        assert_eq!(session.org_scope(), OrgScope::All);
        assert!(session.org_scope().admits(None));
        assert!(session.org_scope().admits(Some(Uuid::new_v4())));
    }

    #[test]
    fn org_roles_only_see_their_organization() {
        let org = Uuid::new_v4();
        let admin = Session { user_id: Uuid::new_v4(), role: Role::Admin, organization_id: Some(org) };
        let scope = admin.org_scope();
        assert!(scope.admits(Some(org)));
        assert!(!scope.admits(Some(Uuid::new_v4())));
        assert!(!scope.admits(None));
    }

    #[test]
    fn org_role_without_organization_sees_nothing() {
        let reviewer = Session { user_id: Uuid::new_v4(), role: Role::Reviewer, organization_id: None };
        assert_eq!(reviewer.org_scope(), OrgScope::Nothing);
        assert!(!reviewer.org_scope().admits(None));
    }

    #[test]
    fn scope_filter_renders_predicate() {
        let org = Uuid::new_v4();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM job_forms jf WHERE TRUE");
        OrgScope::Organization(org).push_filter(&mut qb, "jf.organization_id");
        assert_eq!(qb.sql(), "SELECT 1 FROM job_forms jf WHERE TRUE AND jf.organization_id = $1");

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        OrgScope::Nothing.push_filter(&mut qb, "jf.organization_id");
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE AND FALSE");
    }
}
