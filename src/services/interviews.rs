use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::authz::{authorize, ops, Session};
use crate::clients::ai::{AiClient, JobContext};
use crate::database::models::{Interview, Transcription};
use crate::database::{DatabaseError, DatabaseManager, Repository};
use crate::error::ApiError;
use crate::services::notifications::{notify_all, NewNotification, NotificationKind, NotificationMetadata};
use crate::services::recipients::recipients_for_application;
use crate::services::scope::{ensure_child_in_scope, scoped_application, ApplicationRef};
use crate::services::validation::{max_chars, non_blank, parse_uuid, require_url, Validated};

const INTERVIEW_COLUMNS: &str = "id, application_id, audio_or_video_url, notes, audio_analysis, created_at";
const MAX_NOTES_CHARS: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInterview {
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub audio_or_video_url: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidInterview {
    pub application_id: Uuid,
    pub audio_or_video_url: String,
    pub notes: Option<String>,
}

impl CreateInterview {
    pub fn validate(&self) -> Validated<ValidInterview> {
        let application_id = parse_uuid("application_id", &self.application_id, "Invalid application ID")?;
        let audio_or_video_url = require_url("audio_or_video_url", &self.audio_or_video_url, "Please enter a valid URL")?;
        let notes = non_blank(self.notes.clone());
        if let Some(notes) = &notes {
            max_chars("notes", notes, MAX_NOTES_CHARS, "Notes too long (max 1000 characters)")?;
        }
        Ok(ValidInterview { application_id, audio_or_video_url, notes })
    }
}

fn interviews(pool: &PgPool) -> Repository<'_, Interview> {
    Repository::new("interviews", INTERVIEW_COLUMNS, pool)
}

pub struct InterviewService {
    pool: PgPool,
}

impl InterviewService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    pub async fn create(&self, session: Option<&Session>, request: &CreateInterview) -> Result<Interview, ApiError> {
        let session = authorize(session, &ops::CREATE_INTERVIEW)?;
        let input = request.validate()?;
        let application = scoped_application(&self.pool, &session, input.application_id).await?;

        let sql = format!(
            "INSERT INTO interviews (application_id, audio_or_video_url, notes) VALUES ($1, $2, $3) RETURNING {}",
            INTERVIEW_COLUMNS
        );
        let interview = sqlx::query_as::<_, Interview>(&sql)
            .bind(input.application_id)
            .bind(&input.audio_or_video_url)
            .bind(&input.notes)
            .fetch_one(&self.pool)
            .await?;

        let name = application.candidate_name.as_deref().unwrap_or("A candidate");
        self.notify(
            &application,
            NotificationKind::InterviewScheduled,
            "Interview scheduled",
            format!("An interview was added for {} ({}).", name, application.job_title),
        )
        .await;

        Ok(interview)
    }

    pub async fn list_for_application(&self, session: Option<&Session>, application_id: Uuid) -> Result<Vec<Interview>, ApiError> {
        let session = authorize(session, &ops::LIST_INTERVIEWS)?;
        scoped_application(&self.pool, &session, application_id).await?;
        Ok(interviews(&self.pool).select_by_application(application_id, true).await?)
    }

    pub async fn get(&self, session: Option<&Session>, id: Uuid) -> Result<Interview, ApiError> {
        let session = authorize(session, &ops::GET_INTERVIEW)?;
        let repo = interviews(&self.pool);
        ensure_child_in_scope(&repo, session.org_scope(), id, "Interview not found").await?;
        Ok(repo.select_404(id, "Interview not found").await?)
    }

    pub async fn delete(&self, session: Option<&Session>, id: Uuid) -> Result<Value, ApiError> {
        let session = authorize(session, &ops::DELETE_INTERVIEW)?;
        let repo = interviews(&self.pool);
        ensure_child_in_scope(&repo, session.org_scope(), id, "Interview not found").await?;
        if !repo.delete(id).await? {
            return Err(ApiError::not_found("Interview not found"));
        }
        Ok(json!({ "deleted": true }))
    }

    /// Send the application's newest transcript to the AI service and keep
    /// the result on the interview.
    pub async fn analyze(&self, session: Option<&Session>, ai: &AiClient, id: Uuid) -> Result<Interview, ApiError> {
        let session = authorize(session, &ops::ANALYZE_INTERVIEW)?;
        let repo = interviews(&self.pool);
        ensure_child_in_scope(&repo, session.org_scope(), id, "Interview not found").await?;
        let interview = repo.select_404(id, "Interview not found").await?;

        let transcription = sqlx::query_as::<_, Transcription>(
            "SELECT id, application_id, raw_transcript, clean_transcript, created_at \
             FROM transcriptions WHERE application_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(interview.application_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("No transcription found for this interview"))?;
        let transcript = transcription
            .best_text()
            .ok_or_else(|| ApiError::bad_request("Transcription is empty"))?;

        let job = sqlx::query_as::<_, (String, Option<Value>)>(
            "SELECT jf.title, jf.requirements FROM applications a \
             JOIN job_forms jf ON jf.id = a.job_form_id WHERE a.id = $1",
        )
        .bind(interview.application_id)
        .fetch_optional(&self.pool)
        .await?;
        let context = match &job {
            Some((title, requirements)) => JobContext::from_job(Some(title.as_str()), requirements.as_ref()),
            None => JobContext::from_job(None, None),
        };

        let analysis = ai.analyze_transcript(transcript, &context).await?;

        let sql = format!("UPDATE interviews SET audio_analysis = $1 WHERE id = $2 RETURNING {}", INTERVIEW_COLUMNS);
        let updated = sqlx::query_as::<_, Interview>(&sql)
            .bind(&analysis)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if let Ok(application) = scoped_application(&self.pool, &session, interview.application_id).await {
            let name = application.candidate_name.as_deref().unwrap_or("a candidate");
            self.notify(
                &application,
                NotificationKind::InterviewAnalysisReady,
                "Interview analysis ready",
                format!("AI analysis is ready for the interview with {}.", name),
            )
            .await;
        }

        tracing::info!("Interview {} analyzed", id);
        Ok(updated)
    }

    async fn notify(&self, application: &ApplicationRef, kind: NotificationKind, title: &str, content: String) {
        let recipients = recipients_for_application(&self.pool, application.id).await;
        let metadata = NotificationMetadata::for_application(
            application.id,
            application.candidate_name.as_deref(),
            Some(application.job_id),
            Some(&application.job_title),
        );
        let notification = NewNotification {
            kind,
            title: title.to_string(),
            content,
            metadata: Some(metadata.to_value()),
        };
        notify_all(&self.pool, &recipients, &notification).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(application_id: &str, url: &str, notes: Option<String>) -> CreateInterview {
        CreateInterview {
            application_id: application_id.to_string(),
            audio_or_video_url: url.to_string(),
            notes,
        }
    }

    #[test]
    fn accepts_valid_input() {
        let id = Uuid::new_v4();
        let valid = request(&id.to_string(), "https://cdn.example.com/i.mp4", Some(" good call ".into()))
            .validate()
            .unwrap();
        assert_eq!(valid.application_id, id);
        assert_eq!(valid.notes.as_deref(), Some("good call"));
    }

    #[test]
    fn first_failure_is_reported() {
        let err = request("not-a-uuid", "nope", None).validate().unwrap_err();
        assert_eq!(err.message, "Invalid application ID");

        let err = request(&Uuid::new_v4().to_string(), "nope", None).validate().unwrap_err();
        assert_eq!(err.message, "Please enter a valid URL");
    }

    #[test]
    fn notes_are_limited_to_1000_chars() {
        let id = Uuid::new_v4().to_string();
        assert!(request(&id, "https://x.io/v", Some("a".repeat(1000))).validate().is_ok());
        let err = request(&id, "https://x.io/v", Some("a".repeat(1001))).validate().unwrap_err();
        assert_eq!(err.message, "Notes too long (max 1000 characters)");
    }
}
