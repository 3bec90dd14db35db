use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HrEvaluation {
    pub id: Uuid,
    pub application_id: Uuid,
    pub hr_score: Option<i32>,
    pub hr_notes: Option<String>,
    pub hr_decision: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExternalProfile {
    pub id: Uuid,
    pub application_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub profile_type: String,
    pub url: String,
}
