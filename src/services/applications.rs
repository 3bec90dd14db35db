//! The public apply flow: load the form, begin, submit, and track progress.
//! None of these take a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::clients::mailer::Mailer;
use crate::database::models::{JobForm, Question, QuestionType};
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::email::{send_with_settings, ApplicationConfirmation, ConfirmationAnswer};
use crate::services::notifications::{notify_all, NewNotification, NotificationKind, NotificationMetadata};
use crate::services::recipients::recipients_for_job;
use crate::services::settings::load_settings;
use crate::services::validation::{non_blank, ValidationError};

const MAX_MATCHED_IDS: usize = 25;
const DUPLICATE_SCAN_LIMIT: i64 = 200;

#[derive(Debug, Serialize)]
pub struct ApplyJob {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub requirements: Option<Value>,
    pub benefits: Option<Value>,
    pub deadline: Option<DateTime<Utc>>,
    pub assignment_enabled: bool,
    pub assignment_required: bool,
    pub assignment_type: Option<String>,
    pub assignment_description: Option<String>,
    pub assignment_weight: Option<f64>,
}

impl From<JobForm> for ApplyJob {
    fn from(job: JobForm) -> Self {
        Self {
            id: job.id,
            title: job.title,
            description: job.description,
            department: job.department,
            location: job.location,
            job_type: job.job_type,
            salary_min: job.salary_min,
            salary_max: job.salary_max,
            salary_currency: job.salary_currency,
            requirements: job.requirements,
            benefits: job.benefits,
            deadline: job.deadline,
            assignment_enabled: job.assignment_enabled,
            assignment_required: job.assignment_required,
            assignment_type: job.assignment_type,
            assignment_description: job.assignment_description,
            assignment_weight: job.assignment_weight,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyQuestion {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub label: String,
    pub required: bool,
    pub page_number: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl From<Question> for ApplyQuestion {
    fn from(q: Question) -> Self {
        let question_type = q.normalized_type();
        let options = q.config.get("options").filter(|o| !o.is_null()).cloned();
        let placeholder = q
            .config
            .get("placeholder")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        Self {
            id: q.id,
            question_type,
            label: q.label,
            required: q.required,
            page_number: q.page_number,
            options,
            placeholder,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplyForm {
    pub job: ApplyJob,
    pub questions: Vec<ApplyQuestion>,
}

/// Reasons a job form cannot take applications right now
pub fn check_open(job: &JobForm, now: DateTime<Utc>) -> Result<(), ApiError> {
    if job.status != "active" {
        return Err(ApiError::not_found("Job is not available for applications"));
    }
    if let Some(deadline) = job.deadline {
        if deadline <= now {
            return Err(ApiError::bad_request("The application deadline has passed"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    Email,
    Name,
    EmailOrName,
}

#[derive(Debug, Clone, FromRow)]
pub struct PriorApplication {
    pub id: Uuid,
    pub candidate_email: Option<String>,
    pub candidate_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateMatch {
    pub duplicate: bool,
    #[serde(rename = "matchedBy")]
    pub matched_by: Option<MatchedBy>,
    #[serde(rename = "matchedApplicationIds")]
    pub matched_application_ids: Vec<Uuid>,
}

fn same_text(stored: Option<&str>, given: &str) -> bool {
    !given.is_empty() && stored.is_some_and(|s| s.trim().to_lowercase() == given.to_lowercase())
}

/// Compare a candidate against earlier applications to the same job.
/// A match on either email or name (case-insensitive) is a duplicate.
pub fn match_prior(prior: &[PriorApplication], email: &str, name: &str) -> DuplicateMatch {
    let matching: Vec<&PriorApplication> = prior
        .iter()
        .filter(|p| same_text(p.candidate_email.as_deref(), email) || same_text(p.candidate_name.as_deref(), name))
        .collect();

    if matching.is_empty() {
        return DuplicateMatch::default();
    }

    let by_email = matching.iter().any(|p| same_text(p.candidate_email.as_deref(), email));
    let by_name = matching.iter().any(|p| same_text(p.candidate_name.as_deref(), name));
    let matched_by = match (by_email, by_name) {
        (true, true) => MatchedBy::EmailOrName,
        (true, false) => MatchedBy::Email,
        _ => MatchedBy::Name,
    };

    DuplicateMatch {
        duplicate: true,
        matched_by: Some(matched_by),
        matched_application_ids: matching.iter().take(MAX_MATCHED_IDS).map(|p| p.id).collect(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BeginApplication {
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: Option<Uuid>,
    pub value: Option<String>,
    pub voice_data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitApplication {
    pub application_id: Option<Uuid>,
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: Option<String>,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
    pub resume_url: Option<String>,
}

impl SubmitApplication {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.candidate_name.trim().is_empty() {
            return Err(ValidationError::new("candidate_name", "Candidate name is required"));
        }
        if !self.candidate_email.contains('@') {
            return Err(ValidationError::new("candidate_email", "A valid email is required"));
        }
        Ok(())
    }

    /// Answers not tied to a question are dropped
    fn answer_rows(&self) -> Vec<(Uuid, Option<String>, Option<Value>)> {
        self.answers
            .iter()
            .filter_map(|a| a.question_id.map(|qid| (qid, a.value.clone(), a.voice_data.clone())))
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationStarted {
    pub application_id: Uuid,
    pub is_duplicate: bool,
}

#[derive(Debug, Serialize)]
pub struct ApplicationSubmitted {
    pub application_id: Uuid,
    pub is_duplicate: bool,
    pub answers_saved: usize,
    pub resume_saved: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub step_id: String,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    pub meta: Option<Value>,
}

fn default_event_type() -> String {
    "enter".to_string()
}

pub struct ApplicationService {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
}

impl ApplicationService {
    pub async fn new(mailer: Arc<dyn Mailer>) -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
            mailer,
        })
    }

    async fn open_job(&self, job_id: Uuid) -> Result<JobForm, ApiError> {
        let sql = format!("SELECT {} FROM job_forms WHERE id = $1", JobForm::COLUMNS);
        let job = sqlx::query_as::<_, JobForm>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Job not found"))?;
        check_open(&job, Utc::now())?;
        Ok(job)
    }

    pub async fn get_job_for_application(&self, job_id: Uuid) -> Result<ApplyForm, ApiError> {
        let job = self.open_job(job_id).await?;
        let questions = sqlx::query_as::<_, Question>(
            "SELECT id, job_form_id, type, label, required, page_number, config, order_index \
             FROM questions WHERE job_form_id = $1 ORDER BY order_index",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ApplyForm {
            job: job.into(),
            questions: questions.into_iter().map(ApplyQuestion::from).collect(),
        })
    }

    async fn prior_applications(
        &self,
        job_id: Uuid,
        email: &str,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<PriorApplication>, sqlx::Error> {
        if email.is_empty() && name.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, candidate_email, candidate_name FROM applications WHERE job_form_id = ",
        );
        qb.push_bind(job_id);
        qb.push(" AND (FALSE");
        if !email.is_empty() {
            qb.push(" OR lower(btrim(candidate_email)) = ").push_bind(email.to_lowercase());
        }
        if !name.is_empty() {
            qb.push(" OR lower(btrim(candidate_name)) = ").push_bind(name.to_lowercase());
        }
        qb.push(")");
        if let Some(id) = exclude {
            qb.push(" AND id <> ").push_bind(id);
        }
        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(DUPLICATE_SCAN_LIMIT);

        qb.build_query_as::<PriorApplication>().fetch_all(&self.pool).await
    }

    /// Always creates a new row; earlier applications with the same email or
    /// name flag it as a duplicate.
    pub async fn begin(&self, job_id: Uuid, request: &BeginApplication) -> Result<ApplicationStarted, ApiError> {
        self.open_job(job_id).await?;

        let email = request.candidate_email.as_deref().unwrap_or_default().trim().to_string();
        let name = request.candidate_name.as_deref().unwrap_or_default().trim().to_string();
        let prior = self.prior_applications(job_id, &email, &name, None).await?;
        let matched = match_prior(&prior, &email, &name);

        let application_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO applications (job_form_id, candidate_name, candidate_email, status, is_duplicate, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, NULL) RETURNING id",
        )
        .bind(job_id)
        .bind(non_blank(request.candidate_name.clone()))
        .bind(non_blank(request.candidate_email.clone()))
        .bind(if matched.duplicate { "duplicate" } else { "new" })
        .bind(matched.duplicate)
        .fetch_one(&self.pool)
        .await?;

        let mut meta = json!({
            "candidateEmail": non_blank(Some(email)),
            "candidateName": non_blank(Some(name)),
        });
        merge_match(&mut meta, &matched);
        let event = if matched.duplicate { "begin_duplicate" } else { "begin" };
        record_progress_best_effort(&self.pool, application_id, "candidate", event, Some(meta)).await;

        tracing::info!("Application {} started for job {}", application_id, job_id);
        Ok(ApplicationStarted { application_id, is_duplicate: matched.duplicate })
    }

    /// Finalize an application. Rows written before a failure stay written;
    /// the error then carries the application id.
    pub async fn submit(&self, job_id: Uuid, request: &SubmitApplication) -> Result<ApplicationSubmitted, ApiError> {
        request.validate()?;
        let job = self.open_job(job_id).await?;

        let email = request.candidate_email.trim();
        let name = request.candidate_name.trim();
        let prior = self
            .prior_applications(job_id, email, name, request.application_id)
            .await?;
        let matched = match_prior(&prior, email, name);
        let status = if matched.duplicate { "duplicate" } else { "new" };

        let application_id = match request.application_id {
            Some(id) => sqlx::query_scalar::<_, Uuid>(
                "UPDATE applications SET candidate_name = $1, candidate_email = $2, \
                 candidate_phone = COALESCE($3, candidate_phone), status = $4, is_duplicate = $5, \
                 submitted_at = now(), updated_at = now() \
                 WHERE id = $6 AND job_form_id = $7 RETURNING id",
            )
            .bind(name)
            .bind(email)
            .bind(non_blank(request.candidate_phone.clone()))
            .bind(status)
            .bind(matched.duplicate)
            .bind(id)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Application not found"))?,
            None => sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO applications (job_form_id, candidate_name, candidate_email, candidate_phone, \
                 status, is_duplicate, submitted_at) VALUES ($1, $2, $3, $4, $5, $6, now()) RETURNING id",
            )
            .bind(job_id)
            .bind(name)
            .bind(email)
            .bind(non_blank(request.candidate_phone.clone()))
            .bind(status)
            .bind(matched.duplicate)
            .fetch_one(&self.pool)
            .await?,
        };

        let mut meta = json!({});
        merge_match(&mut meta, &matched);
        record_progress_best_effort(&self.pool, application_id, "submitted", "submit", Some(meta)).await;

        let rows = request.answer_rows();
        if !rows.is_empty() {
            let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO answers (application_id, question_id, value, voice_data) ");
            qb.push_values(rows.iter(), |mut b, (question_id, value, voice_data)| {
                b.push_bind(application_id)
                    .push_bind(*question_id)
                    .push_bind(value.clone())
                    .push_bind(voice_data.clone());
            });
            if let Err(e) = qb.build().execute(&self.pool).await {
                tracing::error!("Failed to save answers for application {}: {}", application_id, e);
                return Err(ApiError::partial_write("Failed to save answers", application_id));
            }
        }

        let resume_url = non_blank(request.resume_url.clone());
        if let Some(url) = &resume_url {
            let saved = sqlx::query("INSERT INTO resumes (application_id, file_url) VALUES ($1, $2)")
                .bind(application_id)
                .bind(url)
                .execute(&self.pool)
                .await;
            if let Err(e) = saved {
                tracing::error!("Failed to save resume for application {}: {}", application_id, e);
                return Err(ApiError::partial_write("Failed to save resume", application_id));
            }
        }

        self.notify_submitted(job_id, application_id, name, matched.duplicate).await;
        self.send_confirmation(&job, request);

        tracing::info!("Application {} submitted for job {}", application_id, job_id);
        Ok(ApplicationSubmitted {
            application_id,
            is_duplicate: matched.duplicate,
            answers_saved: rows.len(),
            resume_saved: resume_url.is_some(),
        })
    }

    async fn notify_submitted(&self, job_id: Uuid, application_id: Uuid, candidate_name: &str, duplicate: bool) {
        let recipients = recipients_for_job(&self.pool, job_id).await;
        if recipients.is_empty() {
            return;
        }
        let job_title = recipients.job.as_ref().map(|j| j.title.clone());
        let title_or_default = job_title.as_deref().unwrap_or("a job");
        let metadata = NotificationMetadata::for_application(application_id, Some(candidate_name), Some(job_id), job_title.as_deref()).to_value();

        let completed = NewNotification {
            kind: NotificationKind::ApplicationCompleted,
            title: "Application completed".to_string(),
            content: format!("{} submitted an application for {}.", candidate_name, title_or_default),
            metadata: Some(metadata.clone()),
        };
        notify_all(&self.pool, &recipients, &completed).await;

        if duplicate {
            let flagged = NewNotification {
                kind: NotificationKind::DuplicateApplication,
                title: "Duplicate application detected".to_string(),
                content: format!("{} submitted a duplicate application for {}.", candidate_name, title_or_default),
                metadata: Some(metadata),
            };
            notify_all(&self.pool, &recipients, &flagged).await;
        }
    }

    /// Fire and forget; the candidate's submission does not wait on SMTP.
    fn send_confirmation(&self, job: &JobForm, request: &SubmitApplication) {
        let pool = self.pool.clone();
        let mailer = Arc::clone(&self.mailer);
        let confirmation = ApplicationConfirmation {
            candidate_email: request.candidate_email.trim().to_string(),
            candidate_name: request.candidate_name.trim().to_string(),
            job_title: job.title.clone(),
            job_description: job.description.clone(),
            answers: request
                .answers
                .iter()
                .map(|a| ConfirmationAnswer { value: a.value.clone(), voice_data: a.voice_data.clone() })
                .collect(),
        };

        tokio::spawn(async move {
            if !load_settings(&pool).await.email.enable_notifications {
                return;
            }
            if let Err(e) = send_with_settings(&pool, mailer.as_ref(), confirmation.render()).await {
                tracing::warn!("Application confirmation email not sent: {}", e);
            }
        });
    }

    pub async fn record_progress(&self, application_id: Uuid, update: &ProgressUpdate) -> Result<Value, ApiError> {
        let step_id = update.step_id.trim();
        if step_id.is_empty() {
            return Err(ValidationError::new("step_id", "Step is required").into());
        }

        let result = sqlx::query(
            "UPDATE applications SET updated_at = now(), last_progress_step = $1, last_progress_event = $2, \
             last_progress_at = now(), last_progress_meta = $3 WHERE id = $4",
        )
        .bind(step_id)
        .bind(&update.event_type)
        .bind(&update.meta)
        .bind(application_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Application not found"));
        }

        insert_progress_event(&self.pool, application_id, step_id, &update.event_type, update.meta.as_ref()).await;
        Ok(json!({ "recorded": true }))
    }
}

fn merge_match(meta: &mut Value, matched: &DuplicateMatch) {
    if let (Some(target), Ok(Value::Object(extra))) = (meta.as_object_mut(), serde_json::to_value(matched)) {
        target.extend(extra);
    }
}

async fn insert_progress_event(pool: &PgPool, application_id: Uuid, step_id: &str, event_type: &str, meta: Option<&Value>) {
    let inserted = sqlx::query(
        "INSERT INTO application_progress_events (application_id, step_id, event_type, meta) VALUES ($1, $2, $3, $4)",
    )
    .bind(application_id)
    .bind(step_id)
    .bind(event_type)
    .bind(meta)
    .execute(pool)
    .await;

    if let Err(e) = inserted {
        tracing::warn!("Progress event for {} not recorded: {}", application_id, e);
    }
}

/// Progress side effect of begin/submit; failures only log
async fn record_progress_best_effort(pool: &PgPool, application_id: Uuid, step_id: &str, event_type: &str, meta: Option<Value>) {
    let updated = sqlx::query(
        "UPDATE applications SET updated_at = now(), last_progress_step = $1, last_progress_event = $2, \
         last_progress_at = now(), last_progress_meta = $3 WHERE id = $4",
    )
    .bind(step_id)
    .bind(event_type)
    .bind(&meta)
    .bind(application_id)
    .execute(pool)
    .await;

    if let Err(e) = updated {
        tracing::warn!("Progress columns for {} not updated: {}", application_id, e);
    }
    insert_progress_event(pool, application_id, step_id, event_type, meta.as_ref()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prior(email: Option<&str>, name: Option<&str>) -> PriorApplication {
        PriorApplication {
            id: Uuid::new_v4(),
            candidate_email: email.map(str::to_string),
            candidate_name: name.map(str::to_string),
        }
    }

    #[test]
    fn no_history_is_not_duplicate() {
        let m = match_prior(&[], "ada@example.com", "Ada");
        assert!(!m.duplicate);
        assert_eq!(m.matched_by, None);
    }

    #[test]
    fn email_match_is_case_insensitive() {
        let rows = vec![prior(Some("ADA@Example.com"), Some("Someone Else"))];
        let m = match_prior(&rows, "ada@example.com", "Ada");
        assert!(m.duplicate);
        assert_eq!(m.matched_by, Some(MatchedBy::Email));
        assert_eq!(m.matched_application_ids, vec![rows[0].id]);
    }

    #[test]
    fn both_kinds_of_match() {
        let rows = vec![prior(Some("ada@example.com"), None), prior(None, Some("ada lovelace"))];
        let m = match_prior(&rows, "ada@example.com", "Ada Lovelace");
        assert_eq!(m.matched_by, Some(MatchedBy::EmailOrName));
        assert_eq!(m.matched_application_ids.len(), 2);
    }

    #[test]
    fn blank_inputs_never_match_blank_rows() {
        let rows = vec![prior(Some(""), Some(""))];
        assert!(!match_prior(&rows, "", "").duplicate);
    }

    #[test]
    fn matched_ids_are_capped() {
        let rows: Vec<_> = (0..40).map(|_| prior(None, Some("Ada"))).collect();
        assert_eq!(match_prior(&rows, "", "Ada").matched_application_ids.len(), 25);
    }

    #[test]
    fn answers_without_question_are_dropped() {
        let req = SubmitApplication {
            application_id: None,
            candidate_name: "Ada".into(),
            candidate_email: "ada@example.com".into(),
            candidate_phone: None,
            answers: vec![
                SubmittedAnswer { question_id: Some(Uuid::new_v4()), value: Some("a".into()), voice_data: None },
                SubmittedAnswer { question_id: None, value: Some("b".into()), voice_data: None },
            ],
            resume_url: None,
        };
        assert_eq!(req.answer_rows().len(), 1);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn submit_requires_name_and_email() {
        let mut req = SubmitApplication {
            application_id: None,
            candidate_name: " ".into(),
            candidate_email: "ada@example.com".into(),
            candidate_phone: None,
            answers: vec![],
            resume_url: None,
        };
        assert_eq!(req.validate().unwrap_err().field, "candidate_name");
        req.candidate_name = "Ada".into();
        req.candidate_email = "nope".into();
        assert_eq!(req.validate().unwrap_err().field, "candidate_email");
    }

    #[test]
    fn match_metadata_shape() {
        let mut meta = json!({"candidateName": "Ada"});
        let m = DuplicateMatch { duplicate: true, matched_by: Some(MatchedBy::EmailOrName), matched_application_ids: vec![] };
        merge_match(&mut meta, &m);
        assert_eq!(meta["matchedBy"], "email_or_name");
        assert_eq!(meta["duplicate"], true);
        assert_eq!(meta["candidateName"], "Ada");
    }

    #[test]
    fn progress_event_type_defaults_to_enter() {
        let update: ProgressUpdate = serde_json::from_value(json!({"step_id": "voice-recording"})).unwrap();
        assert_eq!(update.event_type, "enter");
    }
}
