use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::authz::{authorize, ops, Session};
use crate::database::models::Notification;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::recipients::RecipientSet;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewApplication,
    ApplicationCompleted,
    IncompleteApplication,
    DuplicateApplication,
    AiEvaluationReady,
    InterviewScheduled,
    InterviewUploaded,
    InterviewAnalysisReady,
    AssignmentSubmitted,
    StatusChanged,
    Reminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewApplication => "new_application",
            NotificationKind::ApplicationCompleted => "application_completed",
            NotificationKind::IncompleteApplication => "incomplete_application",
            NotificationKind::DuplicateApplication => "duplicate_application",
            NotificationKind::AiEvaluationReady => "ai_evaluation_ready",
            NotificationKind::InterviewScheduled => "interview_scheduled",
            NotificationKind::InterviewUploaded => "interview_uploaded",
            NotificationKind::InterviewAnalysisReady => "interview_analysis_ready",
            NotificationKind::AssignmentSubmitted => "assignment_submitted",
            NotificationKind::StatusChanged => "status_changed",
            NotificationKind::Reminder => "reminder",
        }
    }
}

/// Links a notification back to the application it is about
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationMetadata {
    pub application_id: Option<Uuid>,
    pub candidate_name: Option<String>,
    pub job_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub action_url: Option<String>,
}

impl NotificationMetadata {
    pub fn for_application(application_id: Uuid, candidate_name: Option<&str>, job_id: Option<Uuid>, job_title: Option<&str>) -> Self {
        Self {
            application_id: Some(application_id),
            candidate_name: candidate_name.map(str::to_string),
            job_id,
            job_title: job_title.map(str::to_string),
            action_url: Some(format!("/admin/candidates/{}", application_id)),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub metadata: Option<Value>,
}

/// Insert one unread notification, retrying without `metadata` on
/// databases that predate that column.
pub async fn create(pool: &PgPool, user_id: Uuid, notification: &NewNotification) -> Result<Notification, sqlx::Error> {
    let first = sqlx::query_as::<_, Notification>(
        "INSERT INTO notifications (user_id, type, title, content, is_read, metadata) \
         VALUES ($1, $2, $3, $4, FALSE, $5) \
         RETURNING id, user_id, type, title, content, is_read, metadata, created_at",
    )
    .bind(user_id)
    .bind(notification.kind.as_str())
    .bind(&notification.title)
    .bind(&notification.content)
    .bind(&notification.metadata)
    .fetch_one(pool)
    .await;

    match first {
        Err(e) if is_missing_metadata_column(&e) => {
            tracing::warn!("notifications.metadata is missing, inserting without it");
            sqlx::query_as::<_, Notification>(
                "INSERT INTO notifications (user_id, type, title, content, is_read) \
                 VALUES ($1, $2, $3, $4, FALSE) \
                 RETURNING id, user_id, type, title, content, is_read, NULL::jsonb AS metadata, created_at",
            )
            .bind(user_id)
            .bind(notification.kind.as_str())
            .bind(&notification.title)
            .bind(&notification.content)
            .fetch_one(pool)
            .await
        }
        other => other,
    }
}

/// Deliver to every recipient concurrently. Failures are logged and skipped;
/// returns how many were stored.
pub async fn notify_all(pool: &PgPool, recipients: &RecipientSet, notification: &NewNotification) -> usize {
    let results = join_all(recipients.recipients.iter().map(|&user_id| async move {
        (user_id, create(pool, user_id, notification).await)
    }))
    .await;

    results
        .into_iter()
        .filter(|(user_id, result)| match result {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    "Failed to store {} notification for {}: {}",
                    notification.kind.as_str(),
                    user_id,
                    e
                );
                false
            }
        })
        .count()
}

fn is_missing_metadata_column(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| mentions_missing_metadata(db.code().as_deref(), db.message()))
        .unwrap_or(false)
}

/// SQLSTATE 42703 is undefined_column
fn mentions_missing_metadata(code: Option<&str>, message: &str) -> bool {
    code == Some("42703") && message.to_lowercase().contains("metadata")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationScope {
    #[default]
    Me,
    All,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub scope: NotificationScope,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    fn gate(session: Option<&Session>, scope: NotificationScope) -> Result<Session, ApiError> {
        let session = match scope {
            NotificationScope::All => authorize(session, &ops::READ_ALL_USERS_NOTIFICATIONS)?,
            NotificationScope::Me => authorize(session, &ops::COUNT_UNREAD_NOTIFICATIONS)?,
        };
        Ok(session)
    }

    pub async fn unread_count(&self, session: Option<&Session>, scope: NotificationScope) -> Result<Value, ApiError> {
        let session = Self::gate(session, scope)?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notifications WHERE is_read = FALSE");
        if scope == NotificationScope::Me {
            qb.push(" AND user_id = ").push_bind(session.user_id);
        }
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(json!({ "count": count }))
    }

    pub async fn list(&self, session: Option<&Session>, query: &NotificationQuery) -> Result<Vec<Notification>, ApiError> {
        let session = match query.scope {
            NotificationScope::All => authorize(session, &ops::READ_ALL_USERS_NOTIFICATIONS)?,
            NotificationScope::Me => authorize(session, &ops::LIST_NOTIFICATIONS)?,
        };

        match self.fetch(&session, query, "metadata").await {
            Err(e) if is_missing_metadata_column(&e) => {
                tracing::warn!("notifications.metadata is missing, listing without it");
                Ok(self.fetch(&session, query, "NULL::jsonb AS metadata").await?)
            }
            other => Ok(other?),
        }
    }

    async fn fetch(&self, session: &Session, query: &NotificationQuery, metadata: &str) -> Result<Vec<Notification>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT id, user_id, type, title, content, is_read, {}, created_at FROM notifications WHERE TRUE",
            metadata
        ));
        if query.scope == NotificationScope::Me {
            qb.push(" AND user_id = ").push_bind(session.user_id);
        }
        if let Some(kind) = query.kind.as_deref().filter(|k| !k.is_empty()) {
            qb.push(" AND type = ").push_bind(kind.to_string());
        }
        if query.unread_only {
            qb.push(" AND is_read = FALSE");
        }
        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(clamp_limit(query.limit));

        qb.build_query_as::<Notification>().fetch_all(&self.pool).await
    }

    /// Only the caller's own rows are touched
    pub async fn mark_read(&self, session: Option<&Session>, id: Uuid) -> Result<Value, ApiError> {
        let session = authorize(session, &ops::MARK_NOTIFICATION_READ)?;
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(session.user_id)
            .execute(&self.pool)
            .await?;
        Ok(json!({ "updated": true }))
    }

    pub async fn mark_all_read(&self, session: Option<&Session>) -> Result<Value, ApiError> {
        let session = authorize(session, &ops::MARK_ALL_NOTIFICATIONS_READ)?;
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
            .bind(session.user_id)
            .execute(&self.pool)
            .await?;
        Ok(json!({ "updated": true, "count": result.rows_affected() }))
    }
}
