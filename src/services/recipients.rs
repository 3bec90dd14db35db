//! Who gets told about activity on a job form.
//!
//! Super-admins always receive everything. Otherwise staff of the job's
//! organization (admins and reviewers) receive it, or for legacy job forms
//! with no organization, the creator alone.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::authz::Role;

/// The parts of a job form that drive routing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct JobOwnership {
    pub id: Uuid,
    pub title: String,
    pub organization_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// One user as seen by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: Uuid,
    pub role: Role,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecipientSet {
    pub recipients: BTreeSet<Uuid>,
    pub job: Option<JobOwnership>,
}

impl RecipientSet {
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }
}

/// Pure routing rule over a snapshot of the user directory.
pub fn resolve_recipients(job: Option<JobOwnership>, directory: &[DirectoryEntry]) -> RecipientSet {
    let Some(job) = job else {
        return RecipientSet::default();
    };

    let mut recipients: BTreeSet<Uuid> = directory
        .iter()
        .filter(|u| u.role == Role::SuperAdmin)
        .map(|u| u.id)
        .collect();

    match job.organization_id {
        Some(org) => recipients.extend(
            directory
                .iter()
                .filter(|u| u.role.is_org_recipient() && u.organization_id == Some(org))
                .map(|u| u.id),
        ),
        None => recipients.extend(job.created_by),
    }

    RecipientSet { recipients, job: Some(job) }
}

/// Recipients for a job form. Lookup failures degrade to an empty set.
pub async fn recipients_for_job(pool: &PgPool, job_form_id: Uuid) -> RecipientSet {
    match load_for_job(pool, job_form_id).await {
        Ok((job, directory)) => resolve_recipients(job, &directory),
        Err(e) => {
            tracing::warn!("Recipient lookup failed for job {}: {}", job_form_id, e);
            RecipientSet::default()
        }
    }
}

/// Recipients for the job form an application belongs to.
pub async fn recipients_for_application(pool: &PgPool, application_id: Uuid) -> RecipientSet {
    let job_form_id = sqlx::query_scalar::<_, Uuid>("SELECT job_form_id FROM applications WHERE id = $1")
        .bind(application_id)
        .fetch_optional(pool)
        .await;

    match job_form_id {
        Ok(Some(job_form_id)) => recipients_for_job(pool, job_form_id).await,
        Ok(None) => {
            tracing::warn!("No application {} to route notifications for", application_id);
            RecipientSet::default()
        }
        Err(e) => {
            tracing::warn!("Application lookup failed for {}: {}", application_id, e);
            RecipientSet::default()
        }
    }
}

async fn load_for_job(
    pool: &PgPool,
    job_form_id: Uuid,
) -> Result<(Option<JobOwnership>, Vec<DirectoryEntry>), sqlx::Error> {
    let job = sqlx::query_as::<_, JobOwnership>(
        "SELECT id, title, organization_id, created_by FROM job_forms WHERE id = $1",
    )
    .bind(job_form_id)
    .fetch_optional(pool)
    .await?;

    let Some(job) = job else {
        return Ok((None, Vec::new()));
    };

    let rows = sqlx::query_as::<_, (Uuid, String, Option<Uuid>)>(
        "SELECT id, role, organization_id FROM users \
         WHERE role = 'super-admin' \
            OR (organization_id = $1 AND role IN ('admin', 'reviewer'))",
    )
    .bind(job.organization_id)
    .fetch_all(pool)
    .await?;

    let directory = rows
        .into_iter()
        .filter_map(|(id, role, organization_id)| {
            role.parse::<Role>().ok().map(|role| DirectoryEntry { id, role, organization_id })
        })
        .collect();

    Ok((Some(job), directory))
}
