use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::authz::{authorize, ops, Session};
use crate::database::models::Answer;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;

const UNKNOWN_FIRST_NAME: &str = "Unknown";
const UNKNOWN_POSITION: &str = "Unknown Position";

/// First word is the first name, the rest is the last name.
pub fn split_candidate_name(full: Option<&str>) -> (String, String) {
    let mut words = full.unwrap_or_default().split_whitespace();
    let first = words.next().unwrap_or(UNKNOWN_FIRST_NAME).to_string();
    let last = words.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[derive(Debug, FromRow)]
struct CandidateRow {
    id: Uuid,
    job_form_id: Uuid,
    job_title: Option<String>,
    candidate_name: Option<String>,
    candidate_email: Option<String>,
    candidate_phone: Option<String>,
    status: String,
    is_duplicate: bool,
    created_at: DateTime<Utc>,
    resume_url: Option<String>,
    linkedin_url: Option<String>,
    portfolio_url: Option<String>,
    hr_score: Option<i32>,
    hr_notes: Option<String>,
    hr_decision: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HrFields {
    pub notes: String,
    pub next_action: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    pub job_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub status: String,
    pub is_duplicate: bool,
    pub applied_date: DateTime<Utc>,
    pub rating: i32,
    pub resume_url: String,
    pub linkedin_url: String,
    pub portfolio_url: String,
    pub hr_fields: HrFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<Answer>>,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        let (first_name, last_name) = split_candidate_name(row.candidate_name.as_deref());
        Self {
            id: row.id,
            job_id: row.job_form_id,
            first_name,
            last_name,
            email: row.candidate_email.unwrap_or_default(),
            phone: row.candidate_phone.unwrap_or_default(),
            position: row.job_title.unwrap_or_else(|| UNKNOWN_POSITION.to_string()),
            status: row.status,
            is_duplicate: row.is_duplicate,
            applied_date: row.created_at,
            rating: row.hr_score.unwrap_or(0),
            resume_url: row.resume_url.unwrap_or_default(),
            linkedin_url: row.linkedin_url.unwrap_or_default(),
            portfolio_url: row.portfolio_url.unwrap_or_default(),
            hr_fields: HrFields {
                notes: row.hr_notes.unwrap_or_default(),
                next_action: row.hr_decision.unwrap_or_else(|| "Review".to_string()),
            },
            answers: None,
        }
    }
}

const CANDIDATE_SELECT: &str = "SELECT a.id, a.job_form_id, jf.title AS job_title, a.candidate_name, \
    a.candidate_email, a.candidate_phone, a.status, a.is_duplicate, a.created_at, \
    (SELECT r.file_url FROM resumes r WHERE r.application_id = a.id ORDER BY r.created_at LIMIT 1) AS resume_url, \
    (SELECT p.url FROM external_profiles p WHERE p.application_id = a.id AND p.type = 'linkedin' LIMIT 1) AS linkedin_url, \
    (SELECT p.url FROM external_profiles p WHERE p.application_id = a.id AND p.type = 'portfolio' LIMIT 1) AS portfolio_url, \
    h.hr_score, h.hr_notes, h.hr_decision \
    FROM applications a \
    JOIN job_forms jf ON jf.id = a.job_form_id \
    LEFT JOIN hr_evaluations h ON h.application_id = a.id \
    WHERE TRUE";

pub struct CandidateService {
    pool: PgPool,
}

impl CandidateService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    pub async fn list(&self, session: Option<&Session>) -> Result<Vec<Candidate>, ApiError> {
        let session = authorize(session, &ops::LIST_CANDIDATES)?;

        let mut qb = QueryBuilder::<Postgres>::new(CANDIDATE_SELECT);
        session.org_scope().push_filter(&mut qb, "jf.organization_id");
        qb.push(" ORDER BY a.created_at DESC");

        let rows = qb.build_query_as::<CandidateRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    /// Newest applications for the dashboard
    pub async fn recent(&self, session: Option<&Session>, limit: i64) -> Result<Vec<Candidate>, ApiError> {
        let session = authorize(session, &ops::RECENT_CANDIDATES)?;

        let mut qb = QueryBuilder::<Postgres>::new(CANDIDATE_SELECT);
        session.org_scope().push_filter(&mut qb, "jf.organization_id");
        qb.push(" ORDER BY a.created_at DESC LIMIT ").push_bind(limit.clamp(1, 50));

        let rows = qb.build_query_as::<CandidateRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    /// Candidates outside the caller's organization are reported as missing
    pub async fn get(&self, session: Option<&Session>, id: Uuid) -> Result<Candidate, ApiError> {
        let session = authorize(session, &ops::GET_CANDIDATE)?;

        let mut qb = QueryBuilder::<Postgres>::new(CANDIDATE_SELECT);
        qb.push(" AND a.id = ").push_bind(id);
        session.org_scope().push_filter(&mut qb, "jf.organization_id");

        let row = qb
            .build_query_as::<CandidateRow>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Candidate not found"))?;

        let answers = sqlx::query_as::<_, Answer>(
            "SELECT id, application_id, question_id, value, voice_data, created_at \
             FROM answers WHERE application_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut candidate = Candidate::from(row);
        candidate.answers = Some(answers);
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_first_and_rest() {
        assert_eq!(split_candidate_name(Some("Ada King Lovelace")), ("Ada".into(), "King Lovelace".into()));
        assert_eq!(split_candidate_name(Some("  Grace   Hopper ")), ("Grace".into(), "Hopper".into()));
        assert_eq!(split_candidate_name(Some("Cher")), ("Cher".into(), String::new()));
    }

    #[test]
    fn missing_name_is_unknown() {
        assert_eq!(split_candidate_name(None), ("Unknown".into(), String::new()));
        assert_eq!(split_candidate_name(Some("   ")), ("Unknown".into(), String::new()));
    }
}
