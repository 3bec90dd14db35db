//! Progress estimates for applications a candidate started but never submitted.
//!
//! Everything that decides a number or a label is a pure function over
//! [`ProgressInputs`]; the service at the bottom only batches the queries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::authz::{authorize, ops, Session};
use crate::database::models::QuestionType;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::candidates::split_candidate_name;

pub const DEFAULT_STEP: &str = "application-info";
const EXPERIENCE_THRESHOLD: u32 = 30;

/// One stored answer, reduced to what the estimator looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSignal {
    pub question_id: Option<Uuid>,
    pub question_type: Option<QuestionType>,
    pub has_value: bool,
    pub has_voice: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressInputs<'a> {
    pub total_questions: i64,
    pub answers: &'a [AnswerSignal],
    pub has_resume: bool,
    pub has_name: bool,
    pub has_email: bool,
    pub tracked_step: Option<&'a str>,
    pub latest_event_step: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Distinct question ids with a stored answer
pub fn answered_count(answers: &[AnswerSignal]) -> i64 {
    answers
        .iter()
        .filter_map(|a| a.question_id)
        .collect::<HashSet<_>>()
        .len() as i64
}

pub fn completion_percentage(answered: i64, total_questions: i64) -> u32 {
    if total_questions <= 0 {
        return 0;
    }
    let pct = (100.0 * answered as f64 / total_questions as f64).round();
    pct.clamp(0.0, u32::MAX as f64) as u32
}

/// Whole minutes between creation and last activity, never below one
pub fn time_spent_minutes(created_at: DateTime<Utc>, updated_at: Option<DateTime<Utc>>) -> i64 {
    let last_activity = updated_at.unwrap_or(created_at);
    let ms = (last_activity - created_at).num_milliseconds();
    ((ms as f64 / 60_000.0).round() as i64).max(1)
}

type StepTier = fn(&ProgressInputs<'_>) -> Option<String>;

/// First tier that yields a step wins.
const STOPPED_AT_TIERS: [(&str, StepTier); 3] = [
    ("tracked", tracked_step),
    ("latest_event", latest_event_step),
    ("answer_types", answer_type_step),
];

fn non_blank(step: Option<&str>) -> Option<String> {
    step.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn tracked_step(inputs: &ProgressInputs<'_>) -> Option<String> {
    non_blank(inputs.tracked_step)
}

fn latest_event_step(inputs: &ProgressInputs<'_>) -> Option<String> {
    non_blank(inputs.latest_event_step)
}

type AnswerRule = fn(&ProgressInputs<'_>) -> bool;

fn has_voice(i: &ProgressInputs<'_>) -> bool {
    i.answers
        .iter()
        .any(|a| a.has_voice || (a.has_value && a.question_type == Some(QuestionType::Voice)))
}

fn has_file(i: &ProgressInputs<'_>) -> bool {
    i.has_resume || i.answers.iter().any(|a| a.has_value && a.question_type == Some(QuestionType::File))
}

fn has_link(i: &ProgressInputs<'_>) -> bool {
    i.answers.iter().any(|a| a.has_value && a.question_type == Some(QuestionType::Url))
}

fn has_text(i: &ProgressInputs<'_>) -> bool {
    i.answers
        .iter()
        .any(|a| a.has_value && matches!(a.question_type, Some(QuestionType::Text) | Some(QuestionType::Textarea)))
}

const ANSWER_TYPE_RULES: [(&str, AnswerRule); 4] = [
    ("voice-recording", has_voice),
    ("file-upload", has_file),
    ("link-input", has_link),
    ("text-questions", has_text),
];

fn answer_type_step(inputs: &ProgressInputs<'_>) -> Option<String> {
    ANSWER_TYPE_RULES
        .iter()
        .find(|(_, rule)| rule(inputs))
        .map(|(step, _)| step.to_string())
}

pub fn stopped_at(inputs: &ProgressInputs<'_>) -> String {
    STOPPED_AT_TIERS
        .iter()
        .find_map(|(_, tier)| tier(inputs))
        .unwrap_or_else(|| DEFAULT_STEP.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    pub personal_info: bool,
    pub experience: bool,
    pub documents: bool,
    pub questionnaire: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressBucket {
    Low,
    Medium,
    High,
}

impl ProgressBucket {
    pub fn for_percentage(pct: u32) -> Self {
        match pct {
            0..=49 => ProgressBucket::Low,
            50..=79 => ProgressBucket::Medium,
            _ => ProgressBucket::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEstimate {
    pub answered_count: i64,
    pub total_questions: i64,
    pub completion_percentage: u32,
    pub time_spent: i64,
    pub stopped_at: String,
    pub progress: SectionProgress,
    pub bucket: ProgressBucket,
}

pub fn estimate(inputs: &ProgressInputs<'_>) -> ProgressEstimate {
    let answered = answered_count(inputs.answers);
    let pct = completion_percentage(answered, inputs.total_questions);

    ProgressEstimate {
        answered_count: answered,
        total_questions: inputs.total_questions,
        completion_percentage: pct,
        time_spent: time_spent_minutes(inputs.created_at, inputs.updated_at),
        stopped_at: stopped_at(inputs),
        progress: SectionProgress {
            personal_info: inputs.has_name && inputs.has_email,
            experience: pct >= EXPERIENCE_THRESHOLD,
            documents: inputs.has_resume,
            questionnaire: answered > 0,
        },
        bucket: ProgressBucket::for_percentage(pct),
    }
}

#[derive(Debug, FromRow)]
struct IncompleteRow {
    id: Uuid,
    job_form_id: Uuid,
    job_title: Option<String>,
    candidate_name: Option<String>,
    candidate_email: Option<String>,
    candidate_phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    last_progress_step: Option<String>,
}

#[derive(Debug, FromRow)]
struct AnswerSignalRow {
    application_id: Uuid,
    question_id: Option<Uuid>,
    question_type: Option<String>,
    has_value: bool,
    has_voice: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub applied_date: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(flatten)]
    pub estimate: ProgressEstimate,
}

#[derive(Debug, Default, Serialize)]
pub struct BucketTotals {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub total: usize,
}

impl BucketTotals {
    fn count(&mut self, bucket: ProgressBucket) {
        match bucket {
            ProgressBucket::Low => self.low += 1,
            ProgressBucket::Medium => self.medium += 1,
            ProgressBucket::High => self.high += 1,
        }
        self.total += 1;
    }
}

#[derive(Debug, Serialize)]
pub struct IncompleteReport {
    pub applications: Vec<IncompleteApplication>,
    pub totals: BucketTotals,
}

pub struct ProgressService {
    pool: PgPool,
}

impl ProgressService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    pub async fn list_incomplete(&self, session: Option<&Session>) -> Result<IncompleteReport, ApiError> {
        let session = authorize(session, &ops::LIST_INCOMPLETE)?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT a.id, a.job_form_id, jf.title AS job_title, a.candidate_name, a.candidate_email, \
             a.candidate_phone, a.created_at, a.updated_at, a.last_progress_step \
             FROM applications a JOIN job_forms jf ON jf.id = a.job_form_id \
             WHERE a.status = 'new' AND a.submitted_at IS NULL",
        );
        session.org_scope().push_filter(&mut qb, "jf.organization_id");
        qb.push(" ORDER BY a.created_at DESC");
        let rows = qb.build_query_as::<IncompleteRow>().fetch_all(&self.pool).await?;

        if rows.is_empty() {
            return Ok(IncompleteReport { applications: Vec::new(), totals: BucketTotals::default() });
        }

        let app_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let job_ids: Vec<Uuid> = rows
            .iter()
            .map(|r| r.job_form_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let (question_totals, answers, resumes, events) = tokio::try_join!(
            self.question_totals(&job_ids),
            self.answer_signals(&app_ids),
            self.applications_with_resume(&app_ids),
            self.latest_event_steps(&app_ids),
        )?;

        let mut totals = BucketTotals::default();
        let applications = rows
            .into_iter()
            .map(|row| {
                let signals = answers.get(&row.id).map(Vec::as_slice).unwrap_or_default();
                let inputs = ProgressInputs {
                    total_questions: question_totals.get(&row.job_form_id).copied().unwrap_or(0),
                    answers: signals,
                    has_resume: resumes.contains(&row.id),
                    has_name: row.candidate_name.as_deref().is_some_and(|n| !n.trim().is_empty()),
                    has_email: row.candidate_email.as_deref().is_some_and(|e| !e.trim().is_empty()),
                    tracked_step: row.last_progress_step.as_deref(),
                    latest_event_step: events.get(&row.id).map(String::as_str),
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                };
                let estimate = estimate(&inputs);
                totals.count(estimate.bucket);

                let (first_name, last_name) = split_candidate_name(row.candidate_name.as_deref());
                IncompleteApplication {
                    id: row.id,
                    job_id: row.job_form_id,
                    first_name,
                    last_name,
                    email: row.candidate_email.unwrap_or_default(),
                    phone: row.candidate_phone.unwrap_or_default(),
                    position: row.job_title.unwrap_or_else(|| "Unknown Position".to_string()),
                    applied_date: row.created_at,
                    last_activity: row.updated_at.unwrap_or(row.created_at),
                    estimate,
                }
            })
            .collect();

        Ok(IncompleteReport { applications, totals })
    }

    async fn question_totals(&self, job_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT job_form_id, COUNT(*) FROM questions WHERE job_form_id = ANY($1) GROUP BY job_form_id",
        )
        .bind(job_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn answer_signals(&self, app_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<AnswerSignal>>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AnswerSignalRow>(
            "SELECT an.application_id, an.question_id, q.type AS question_type, \
             (an.value IS NOT NULL AND btrim(an.value) <> '') AS has_value, \
             (an.voice_data IS NOT NULL AND an.voice_data <> 'null'::jsonb) AS has_voice \
             FROM answers an LEFT JOIN questions q ON q.id = an.question_id \
             WHERE an.application_id = ANY($1)",
        )
        .bind(app_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_app: HashMap<Uuid, Vec<AnswerSignal>> = HashMap::new();
        for row in rows {
            by_app.entry(row.application_id).or_default().push(AnswerSignal {
                question_id: row.question_id,
                question_type: row.question_type.as_deref().map(QuestionType::normalize),
                has_value: row.has_value,
                has_voice: row.has_voice,
            });
        }
        Ok(by_app)
    }

    async fn applications_with_resume(&self, app_ids: &[Uuid]) -> Result<HashSet<Uuid>, sqlx::Error> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT application_id FROM resumes WHERE application_id = ANY($1)",
        )
        .bind(app_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    /// Newest event step per application
    async fn latest_event_steps(&self, app_ids: &[Uuid]) -> Result<HashMap<Uuid, String>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT DISTINCT ON (application_id) application_id, step_id \
             FROM application_progress_events WHERE application_id = ANY($1) \
             ORDER BY application_id, created_at DESC",
        )
        .bind(app_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
