use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::authz::{authorize, ops, Role, Session};
use crate::database::models::HrEvaluation;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::scope::scoped_application;
use crate::services::validation::{max_chars, non_blank, ValidationError};

const EVALUATION_COLUMNS: &str = "id, application_id, hr_score, hr_notes, hr_decision, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    StrongHire,
    Hire,
    NoHire,
}

impl Recommendation {
    /// Decisions are compared lowercased; unknown decisions are `NoHire`
    pub fn from_decision(decision: Option<&str>) -> Self {
        match decision.unwrap_or_default().trim().to_lowercase().as_str() {
            "strong offer" => Recommendation::StrongHire,
            "offer" | "interview" => Recommendation::Hire,
            _ => Recommendation::NoHire,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HrEvaluationInput {
    pub hr_score: Option<i32>,
    pub hr_notes: Option<String>,
    pub hr_decision: Option<String>,
}

impl HrEvaluationInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(score) = self.hr_score {
            if !(0..=100).contains(&score) {
                return Err(ValidationError::new("hr_score", "Score must be between 0 and 100"));
            }
        }
        if let Some(notes) = &self.hr_notes {
            max_chars("hr_notes", notes, 10_000, "Notes too long (max 10,000 characters)")?;
        }
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct EvaluationRow {
    id: Uuid,
    application_id: Uuid,
    hr_score: Option<i32>,
    hr_notes: Option<String>,
    hr_decision: Option<String>,
    created_at: DateTime<Utc>,
    candidate_name: Option<String>,
    job_title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationScores {
    pub technical: i32,
    pub communication: i32,
    pub problem_solving: i32,
    pub experience: i32,
    pub overall: i32,
}

impl EvaluationScores {
    /// Only one HR score is recorded; every dimension mirrors it
    fn uniform(score: i32) -> Self {
        Self {
            technical: score,
            communication: score,
            problem_solving: score,
            experience: score,
            overall: score,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_position: String,
    pub decision: Option<String>,
    pub recommendation: Recommendation,
    pub scores: EvaluationScores,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<EvaluationRow> for EvaluationSummary {
    fn from(row: EvaluationRow) -> Self {
        Self {
            id: row.id,
            candidate_id: row.application_id,
            candidate_name: row.candidate_name.unwrap_or_else(|| "Unknown".to_string()),
            candidate_position: row.job_title.unwrap_or_else(|| "Unknown Position".to_string()),
            recommendation: Recommendation::from_decision(row.hr_decision.as_deref()),
            decision: row.hr_decision,
            scores: EvaluationScores::uniform(row.hr_score.unwrap_or(0)),
            notes: row.hr_notes.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

pub struct EvaluationService {
    pool: PgPool,
}

impl EvaluationService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    /// One HR evaluation per application; later saves overwrite it.
    pub async fn upsert_hr(
        &self,
        session: Option<&Session>,
        application_id: Uuid,
        input: &HrEvaluationInput,
    ) -> Result<HrEvaluation, ApiError> {
        let session = authorize(session, &ops::UPSERT_HR_EVALUATION)?;
        input.validate()?;
        scoped_application(&self.pool, &session, application_id).await?;

        let sql = format!(
            "INSERT INTO hr_evaluations (application_id, hr_score, hr_notes, hr_decision) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (application_id) DO UPDATE SET hr_score = EXCLUDED.hr_score, hr_notes = EXCLUDED.hr_notes, \
             hr_decision = EXCLUDED.hr_decision, updated_at = now() RETURNING {}",
            EVALUATION_COLUMNS
        );
        let evaluation = sqlx::query_as::<_, HrEvaluation>(&sql)
            .bind(application_id)
            .bind(input.hr_score)
            .bind(non_blank(input.hr_notes.clone()))
            .bind(non_blank(input.hr_decision.clone()))
            .fetch_one(&self.pool)
            .await?;

        tracing::info!("HR evaluation saved for application {} by {}", application_id, session.user_id);
        Ok(evaluation)
    }

    pub async fn get_hr(&self, session: Option<&Session>, application_id: Uuid) -> Result<Option<HrEvaluation>, ApiError> {
        let session = authorize(session, &ops::GET_HR_EVALUATION)?;
        scoped_application(&self.pool, &session, application_id).await?;

        let sql = format!("SELECT {} FROM hr_evaluations WHERE application_id = $1", EVALUATION_COLUMNS);
        Ok(sqlx::query_as::<_, HrEvaluation>(&sql)
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Admins only see evaluations on job forms they created
    pub async fn list(&self, session: Option<&Session>) -> Result<Vec<EvaluationSummary>, ApiError> {
        let session = authorize(session, &ops::LIST_EVALUATIONS)?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT h.id, h.application_id, h.hr_score, h.hr_notes, h.hr_decision, h.created_at, \
             a.candidate_name, jf.title AS job_title \
             FROM hr_evaluations h \
             JOIN applications a ON a.id = h.application_id \
             JOIN job_forms jf ON jf.id = a.job_form_id WHERE TRUE",
        );
        session.org_scope().push_filter(&mut qb, "jf.organization_id");
        if session.role == Role::Admin {
            qb.push(" AND jf.created_by = ").push_bind(session.user_id);
        }
        qb.push(" ORDER BY h.created_at DESC");

        let rows = qb.build_query_as::<EvaluationRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(EvaluationSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_map() {
        assert_eq!(Recommendation::from_decision(Some("Offer")), Recommendation::Hire);
        assert_eq!(Recommendation::from_decision(Some("STRONG OFFER")), Recommendation::StrongHire);
        assert_eq!(Recommendation::from_decision(Some("interview")), Recommendation::Hire);
        assert_eq!(Recommendation::from_decision(Some("reject")), Recommendation::NoHire);
        assert_eq!(Recommendation::from_decision(Some("review")), Recommendation::NoHire);
        assert_eq!(Recommendation::from_decision(Some("maybe")), Recommendation::NoHire);
        assert_eq!(Recommendation::from_decision(None), Recommendation::NoHire);
    }

    #[test]
    fn recommendation_serializes_kebab_case() {
        assert_eq!(serde_json::to_value(Recommendation::StrongHire).unwrap(), "strong-hire");
        assert_eq!(serde_json::to_value(Recommendation::NoHire).unwrap(), "no-hire");
    }

    #[test]
    fn score_range_is_checked() {
        let input = HrEvaluationInput { hr_score: Some(101), hr_notes: None, hr_decision: None };
        assert_eq!(input.validate().unwrap_err().field, "hr_score");
        let input = HrEvaluationInput { hr_score: Some(80), hr_notes: Some("solid".into()), hr_decision: Some("offer".into()) };
        assert!(input.validate().is_ok());
    }
}
