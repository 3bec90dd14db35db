use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Duration;
use uuid::Uuid;

use crate::authz::{authorize, ops, require_job_owner_or_super, Session};
use crate::database::models::{JobForm, Question, QuestionType, User};
use crate::database::{is_transient, DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::activity::{log_activity, NewActivity, RequestOrigin};
use crate::services::validation::{non_blank, ValidationError};

const JOB_STATUSES: [&str; 4] = ["draft", "active", "paused", "closed"];
const UPDATE_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 250;

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    #[serde(rename = "type", default)]
    pub question_type: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    pub page_number: Option<i32>,
    pub options: Option<Vec<String>>,
    pub placeholder: Option<String>,
}

impl QuestionInput {
    fn config(&self) -> Value {
        let mut config = Map::new();
        if let Some(options) = &self.options {
            config.insert("options".to_string(), json!(options));
        }
        if let Some(placeholder) = non_blank(self.placeholder.clone()) {
            config.insert("placeholder".to_string(), Value::String(placeholder));
        }
        Value::Object(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub requirements: Option<Value>,
    pub benefits: Option<Value>,
    pub deadline: Option<DateTime<Utc>>,
    pub hiring_manager_name: Option<String>,
    pub evaluation_criteria: Option<Value>,
    #[serde(default)]
    pub assignment_enabled: bool,
    #[serde(default)]
    pub assignment_required: bool,
    pub assignment_type: Option<String>,
    pub assignment_description: Option<String>,
    pub assignment_weight: Option<f64>,
    /// `None` leaves the stored question set untouched on update
    #[serde(default)]
    pub questions: Option<Vec<QuestionInput>>,
}

impl JobInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title", "Title is required"));
        }
        if let Some(status) = &self.status {
            if !JOB_STATUSES.contains(&status.as_str()) {
                return Err(ValidationError::new("status", "Status must be draft, active, paused or closed"));
            }
        }
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                return Err(ValidationError::new("salary_min", "Minimum salary exceeds maximum salary"));
            }
        }
        if self.questions().iter().any(|q| q.label.trim().is_empty()) {
            return Err(ValidationError::new("questions", "Every question needs a label"));
        }
        Ok(())
    }

    fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("draft")
    }

    fn questions(&self) -> &[QuestionInput] {
        self.questions.as_deref().unwrap_or_default()
    }
}

fn job_activity(action: &'static str, id: Uuid, description: String) -> NewActivity {
    NewActivity {
        action,
        target: Some(id.to_string()),
        target_type: "job_form",
        description,
    }
}

/// Hiring manager values that look like a user id must name a user of the
/// job's organization. Free-text names pass through. `found` is the looked-up
/// user's organization, outer `None` when there is no such user.
pub fn check_hiring_manager(
    raw: Option<&str>,
    found: Option<Option<Uuid>>,
    job_organization: Option<Uuid>,
) -> Result<(), ApiError> {
    let Some(raw) = raw else { return Ok(()) };
    if Uuid::parse_str(raw.trim()).is_err() {
        return Ok(());
    }
    match found {
        None => Err(ApiError::bad_request("Invalid hiring manager")),
        Some(org) if org.is_some() && org == job_organization => Ok(()),
        Some(_) => Err(ApiError::bad_request("Hiring manager must belong to the same organization")),
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct JobSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub job: JobForm,
    pub applicant_count: i64,
}

#[derive(Debug, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobForm,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationUsersQuery {
    pub job_id: Option<Uuid>,
}

pub struct JobService {
    pool: PgPool,
}

impl JobService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    pub async fn list(&self, session: Option<&Session>) -> Result<Vec<JobSummary>, ApiError> {
        let session = authorize(session, &ops::LIST_JOBS)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}, (SELECT count(*) FROM applications a WHERE a.job_form_id = jf.id) AS applicant_count \
             FROM job_forms jf WHERE TRUE",
            JobForm::COLUMNS
        ));
        session.org_scope().push_filter(&mut qb, "jf.organization_id");
        qb.push(" ORDER BY jf.created_at DESC");

        Ok(qb.build_query_as::<JobSummary>().fetch_all(&self.pool).await?)
    }

    pub async fn get(&self, session: Option<&Session>, id: Uuid) -> Result<JobDetail, ApiError> {
        let session = authorize(session, &ops::GET_JOB)?;

        let job = self.find(id).await?;
        if !session.org_scope().admits(job.organization_id) {
            return Err(ApiError::forbidden("Access denied: Job belongs to another organization."));
        }
        let questions = self.questions(id).await?;
        Ok(JobDetail { job, questions })
    }

    pub async fn create(
        &self,
        session: Option<&Session>,
        origin: &RequestOrigin,
        input: &JobInput,
    ) -> Result<JobDetail, ApiError> {
        let session = authorize(session, &ops::CREATE_JOB)?;
        let organization_id = session
            .organization_id
            .ok_or_else(|| ApiError::bad_request("Missing organization for current user"))?;
        input.validate()?;
        self.verify_hiring_manager(input.hiring_manager_name.as_deref(), Some(organization_id))
            .await?;

        let mut tx = self.pool.begin().await?;
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO job_forms (title, description, department, location, type, status, salary_min, salary_max, \
             salary_currency, requirements, benefits, deadline, hiring_manager_name, evaluation_criteria, \
             assignment_enabled, assignment_required, assignment_type, assignment_description, assignment_weight, \
             created_by, organization_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, COALESCE($14, '{}'::jsonb), \
             $15, $16, $17, $18, $19, $20, $21) RETURNING id",
        )
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(&input.department)
        .bind(&input.location)
        .bind(&input.job_type)
        .bind(input.status())
        .bind(input.salary_min)
        .bind(input.salary_max)
        .bind(&input.salary_currency)
        .bind(&input.requirements)
        .bind(&input.benefits)
        .bind(input.deadline)
        .bind(non_blank(input.hiring_manager_name.clone()))
        .bind(&input.evaluation_criteria)
        .bind(input.assignment_enabled)
        .bind(input.assignment_required)
        .bind(&input.assignment_type)
        .bind(&input.assignment_description)
        .bind(input.assignment_weight)
        .bind(session.user_id)
        .bind(organization_id)
        .fetch_one(&mut *tx)
        .await?;
        insert_questions(&mut tx, id, input.questions()).await?;
        tx.commit().await?;

        let description = format!("Created job \"{}\"", input.title.trim());
        log_activity(&self.pool, &session, origin, job_activity("job.create", id, description)).await;

        tracing::info!("Job {} created by {}", id, session.user_id);
        self.detail(id).await
    }

    /// Replaces the job's fields, and its whole question set when `questions` is present
    pub async fn update(
        &self,
        session: Option<&Session>,
        origin: &RequestOrigin,
        id: Uuid,
        input: &JobInput,
    ) -> Result<JobDetail, ApiError> {
        let session = require_job_owner_or_super(&self.pool, session, &ops::UPDATE_JOB, id).await?;
        input.validate()?;
        let existing = self.find(id).await?;
        self.verify_hiring_manager(input.hiring_manager_name.as_deref(), existing.organization_id)
            .await?;

        let mut attempt = 1;
        loop {
            match self.write_update(id, input).await {
                Ok(()) => break,
                Err(e) if attempt < UPDATE_ATTEMPTS && is_transient(&e) => {
                    tracing::warn!("Job {} update attempt {} failed, retrying: {}", id, attempt, e);
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let description = format!("Updated job \"{}\"", input.title.trim());
        log_activity(&self.pool, &session, origin, job_activity("job.update", id, description)).await;
        self.detail(id).await
    }

    async fn write_update(&self, id: Uuid, input: &JobInput) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE job_forms SET title = $1, description = $2, department = $3, location = $4, type = $5, \
             status = COALESCE($6, status), salary_min = $7, salary_max = $8, salary_currency = $9, \
             requirements = $10, benefits = $11, deadline = $12, hiring_manager_name = $13, \
             evaluation_criteria = COALESCE($14, evaluation_criteria), assignment_enabled = $15, \
             assignment_required = $16, assignment_type = $17, assignment_description = $18, \
             assignment_weight = $19, updated_at = now() WHERE id = $20",
        )
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(&input.department)
        .bind(&input.location)
        .bind(&input.job_type)
        .bind(&input.status)
        .bind(input.salary_min)
        .bind(input.salary_max)
        .bind(&input.salary_currency)
        .bind(&input.requirements)
        .bind(&input.benefits)
        .bind(input.deadline)
        .bind(non_blank(input.hiring_manager_name.clone()))
        .bind(&input.evaluation_criteria)
        .bind(input.assignment_enabled)
        .bind(input.assignment_required)
        .bind(&input.assignment_type)
        .bind(&input.assignment_description)
        .bind(input.assignment_weight)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(questions) = &input.questions {
            sqlx::query("DELETE FROM questions WHERE job_form_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_questions(&mut tx, id, questions).await?;
        }
        tx.commit().await
    }

    /// Applications go first, then questions, then the job itself
    pub async fn delete(&self, session: Option<&Session>, origin: &RequestOrigin, id: Uuid) -> Result<Value, ApiError> {
        let session = require_job_owner_or_super(&self.pool, session, &ops::DELETE_JOB, id).await?;
        let job = self.find(id).await?;

        let mut tx = self.pool.begin().await?;
        let applications = sqlx::query("DELETE FROM applications WHERE job_form_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM questions WHERE job_form_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM job_forms WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(ApiError::not_found("Job not found"));
        }
        tx.commit().await?;

        let description = format!("Deleted job \"{}\"", job.title);
        log_activity(&self.pool, &session, origin, job_activity("job.delete", id, description)).await;

        tracing::info!("Job {} deleted by {} ({} applications removed)", id, session.user_id, applications);
        Ok(json!({ "deleted": true, "applications_deleted": applications }))
    }

    pub async fn close(&self, session: Option<&Session>, origin: &RequestOrigin, id: Uuid) -> Result<JobForm, ApiError> {
        let session = require_job_owner_or_super(&self.pool, session, &ops::CLOSE_JOB, id).await?;

        let result = sqlx::query("UPDATE job_forms SET status = 'closed', updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Job not found"));
        }
        let job = self.find(id).await?;

        let description = format!("Closed job \"{}\"", job.title);
        log_activity(&self.pool, &session, origin, job_activity("job.close", id, description)).await;
        Ok(job)
    }

    pub async fn organization_users(
        &self,
        session: Option<&Session>,
        query: &OrganizationUsersQuery,
    ) -> Result<Vec<User>, ApiError> {
        let session = authorize(session, &ops::LIST_ORGANIZATION_USERS)?;

        let organization_id = match query.job_id {
            Some(job_id) if session.role.is_global() => self.find(job_id).await?.organization_id,
            _ => session.organization_id,
        }
        .ok_or_else(|| ApiError::bad_request("Missing organization for current user"))?;

        let users = sqlx::query_as::<_, User>(
            "SELECT id, email, name, role, organization_id, is_active, last_sign_in_at, created_at \
             FROM users WHERE organization_id = $1 ORDER BY COALESCE(name, email)",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn verify_hiring_manager(&self, raw: Option<&str>, job_organization: Option<Uuid>) -> Result<(), ApiError> {
        let Some(user_id) = raw.and_then(|r| Uuid::parse_str(r.trim()).ok()) else {
            return Ok(());
        };
        let found = sqlx::query_scalar::<_, Option<Uuid>>("SELECT organization_id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        check_hiring_manager(raw, found, job_organization)
    }

    async fn find(&self, id: Uuid) -> Result<JobForm, ApiError> {
        let sql = format!("SELECT {} FROM job_forms WHERE id = $1", JobForm::COLUMNS);
        sqlx::query_as::<_, JobForm>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Job not found"))
    }

    async fn questions(&self, job_id: Uuid) -> Result<Vec<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            "SELECT id, job_form_id, type, label, required, page_number, config, order_index \
             FROM questions WHERE job_form_id = $1 ORDER BY order_index",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn detail(&self, id: Uuid) -> Result<JobDetail, ApiError> {
        let job = self.find(id).await?;
        let questions = self.questions(id).await?;
        Ok(JobDetail { job, questions })
    }
}

/// `order_index` is 1-based in submission order
async fn insert_questions(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
    questions: &[QuestionInput],
) -> Result<(), sqlx::Error> {
    if questions.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO questions (job_form_id, type, label, required, page_number, config, order_index) ",
    );
    qb.push_values(questions.iter().enumerate(), |mut b, (i, q)| {
        b.push_bind(job_id)
            .push_bind(QuestionType::normalize(&q.question_type).as_str())
            .push_bind(q.label.trim().to_string())
            .push_bind(q.required)
            .push_bind(q.page_number.unwrap_or(1))
            .push_bind(q.config())
            .push_bind(i as i32 + 1);
    });
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(value: Value) -> JobInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn status_defaults_to_draft() {
        let job = input(json!({"title": "Backend Engineer"}));
        assert_eq!(job.status(), "draft");
        assert!(job.validate().is_ok());
    }

    #[test]
    fn rejects_blank_title_and_unknown_status() {
        assert_eq!(input(json!({"title": "  "})).validate().unwrap_err().field, "title");
        let err = input(json!({"title": "x", "status": "archived"})).validate().unwrap_err();
        assert_eq!(err.field, "status");
    }

    #[test]
    fn question_config_carries_options() {
        let job = input(json!({
            "title": "x",
            "questions": [
                {"type": "dropdown", "label": "Level", "options": ["Junior", "Senior"]},
                {"type": "text", "label": "Why us?"}
            ]
        }));
        let questions = job.questions();
        assert_eq!(questions[0].config(), json!({"options": ["Junior", "Senior"]}));
        assert_eq!(questions[1].config(), json!({}));
        assert_eq!(questions[1].page_number, None);
    }

    #[test]
    fn update_without_questions_key_keeps_question_set() {
        let job = input(json!({"title": "Eng (renamed)", "status": "active"}));
        assert!(job.questions.is_none());
        assert!(job.questions().is_empty());
        assert!(job.validate().is_ok());

        let cleared = input(json!({"title": "Eng", "questions": []}));
        assert_eq!(cleared.questions.as_ref().map(Vec::len), Some(0));
    }

    #[test]
    fn job_activity_targets_the_job_form() {
        let id = Uuid::new_v4();
        let entry = job_activity("job.close", id, "Closed job \"Eng\"".to_string());
        assert_eq!(entry.action, "job.close");
        assert_eq!(entry.target, Some(id.to_string()));
        assert_eq!(entry.target_type, "job_form");
    }

    #[test]
    fn free_text_hiring_manager_is_accepted() {
        assert!(check_hiring_manager(Some("Jane Smith"), None, Some(Uuid::new_v4())).is_ok());
        assert!(check_hiring_manager(None, None, None).is_ok());
    }

    #[test]
    fn hiring_manager_id_must_exist_in_same_org() {
        let org = Uuid::new_v4();
        let id = Uuid::new_v4().to_string();

        let missing = check_hiring_manager(Some(&id), None, Some(org)).unwrap_err();
        assert_eq!(missing.message(), "Invalid hiring manager");

        let other = check_hiring_manager(Some(&id), Some(Some(Uuid::new_v4())), Some(org)).unwrap_err();
        assert_eq!(other.message(), "Hiring manager must belong to the same organization");

        let unaffiliated = check_hiring_manager(Some(&id), Some(None), Some(org)).unwrap_err();
        assert_eq!(unaffiliated.status_code(), 400);

        assert!(check_hiring_manager(Some(&id), Some(Some(org)), Some(org)).is_ok());
    }
}
