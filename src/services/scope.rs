use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::authz::{OrgScope, Session};
use crate::database::Repository;
use crate::error::ApiError;

/// An application together with the job form it inherits its scope from.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRef {
    pub id: Uuid,
    pub candidate_name: Option<String>,
    pub job_id: Uuid,
    pub job_title: String,
    pub organization_id: Option<Uuid>,
}

/// Applications outside the session's scope are reported as missing.
pub async fn scoped_application(pool: &PgPool, session: &Session, application_id: Uuid) -> Result<ApplicationRef, ApiError> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT a.id, a.candidate_name, jf.id AS job_id, jf.title AS job_title, jf.organization_id \
         FROM applications a JOIN job_forms jf ON jf.id = a.job_form_id WHERE a.id = ",
    );
    qb.push_bind(application_id);
    session.org_scope().push_filter(&mut qb, "jf.organization_id");

    qb.build_query_as::<ApplicationRef>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))
}

/// Scope check for a child row of an application (interview, assignment).
pub async fn ensure_child_in_scope<T>(
    repo: &Repository<'_, T>,
    scope: OrgScope,
    id: Uuid,
    not_found: &str,
) -> Result<(), ApiError>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    match repo.owning_organization(id).await? {
        Some(org) if scope.admits(org) => Ok(()),
        _ => Err(ApiError::not_found(not_found)),
    }
}
