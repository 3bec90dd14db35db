use sqlx::PgPool;
use uuid::Uuid;

use super::permissions::Operation;
use super::{Role, Session};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    #[error("{0}")]
    AccessDenied(&'static str),
}

/// Named role gates. Each admits an exact set of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Staff,
    AdminOrSuper,
    SuperAdmin,
    ReviewerOrAdmin,
    ReviewerOrAbove,
    Admin,
    /// Admin-or-super at the role level; admins must also own the job form
    JobOwnerOrSuper,
}

impl Gate {
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Gate::Staff | Gate::ReviewerOrAdmin | Gate::ReviewerOrAbove => {
                &[Role::SuperAdmin, Role::Admin, Role::Reviewer]
            }
            Gate::AdminOrSuper | Gate::JobOwnerOrSuper => &[Role::SuperAdmin, Role::Admin],
            Gate::SuperAdmin => &[Role::SuperAdmin],
            Gate::Admin => &[Role::Admin],
        }
    }

    pub fn admits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }

    pub fn denial(&self) -> &'static str {
        match self {
            Gate::Staff => "Access denied: Staff only.",
            Gate::AdminOrSuper | Gate::JobOwnerOrSuper => "Access denied: Admin or Super Admin required.",
            Gate::SuperAdmin => "Access denied: Super Admin only.",
            Gate::ReviewerOrAdmin => "Access denied: Reviewer or Admin required.",
            Gate::ReviewerOrAbove => "Access denied: Reviewer or above required.",
            Gate::Admin => "Access denied: Admin required.",
        }
    }

    /// Role-level check. Idempotent and free of side effects.
    pub fn check(&self, session: Option<&Session>) -> Result<Session, AuthzError> {
        match session {
            Some(s) if self.admits(s.role) => Ok(s.clone()),
            _ => Err(AuthzError::AccessDenied(self.denial())),
        }
    }
}

/// Gate a registered operation.
pub fn authorize(session: Option<&Session>, operation: &Operation) -> Result<Session, AuthzError> {
    operation.gate.check(session).map_err(|e| {
        tracing::debug!("Operation '{}' rejected: {}", operation.name, e);
        e
    })
}

pub fn require_staff(session: Option<&Session>) -> Result<Session, AuthzError> {
    Gate::Staff.check(session)
}

pub fn require_admin_or_super(session: Option<&Session>) -> Result<Session, AuthzError> {
    Gate::AdminOrSuper.check(session)
}

pub fn require_super_admin(session: Option<&Session>) -> Result<Session, AuthzError> {
    Gate::SuperAdmin.check(session)
}

pub fn require_reviewer_or_admin(session: Option<&Session>) -> Result<Role, AuthzError> {
    Gate::ReviewerOrAdmin.check(session).map(|s| s.role)
}

pub fn require_reviewer_or_above(session: Option<&Session>) -> Result<Session, AuthzError> {
    Gate::ReviewerOrAbove.check(session)
}

pub fn require_admin(session: Option<&Session>) -> Result<Session, AuthzError> {
    Gate::Admin.check(session)
}

pub const JOB_OWNER_ONLY: &str = "Access denied: Job owner only.";

/// Ownership half of the job-owner gate, given the job's `created_by`.
/// `None` means the job could not be found.
pub fn check_job_owner(session: &Session, created_by: Option<Option<Uuid>>) -> Result<(), AuthzError> {
    match session.role {
        Role::SuperAdmin => Ok(()),
        Role::Admin | Role::Reviewer => match created_by {
            Some(Some(owner)) if owner == session.user_id => Ok(()),
            _ => Err(AuthzError::AccessDenied(JOB_OWNER_ONLY)),
        },
    }
}

/// Full job-owner decision for a registered job operation: the operation's
/// gate first, then ownership for anyone below super-admin.
pub fn check_job_operation(
    session: Option<&Session>,
    operation: &Operation,
    created_by: Option<Option<Uuid>>,
) -> Result<Session, AuthzError> {
    let session = authorize(session, operation)?;
    check_job_owner(&session, created_by)?;
    Ok(session)
}

/// Super-admin bypasses; otherwise the caller must be the admin who
/// created the job form. Lookup failures deny.
pub async fn require_job_owner_or_super(
    pool: &PgPool,
    session: Option<&Session>,
    operation: &Operation,
    job_id: Uuid,
) -> Result<Session, AuthzError> {
    let admitted = authorize(session, operation)?;
    if admitted.role.is_global() {
        return Ok(admitted);
    }

    let created_by = sqlx::query_scalar::<_, Option<Uuid>>("SELECT created_by FROM job_forms WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Job ownership lookup failed for {}: {}", job_id, e);
            None
        });

    check_job_operation(Some(&admitted), operation, created_by)
}
