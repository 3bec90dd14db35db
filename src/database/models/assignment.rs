use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored shape: `link_fields` holds a JSON array encoded as text.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub application_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub assignment_type: String,
    pub text_fields: Option<String>,
    pub link_fields: Option<String>,
    pub created_at: DateTime<Utc>,
}
