use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interview {
    pub id: Uuid,
    pub application_id: Uuid,
    pub audio_or_video_url: String,
    pub notes: Option<String>,
    pub audio_analysis: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transcription {
    pub id: Uuid,
    pub application_id: Uuid,
    pub raw_transcript: Option<String>,
    pub clean_transcript: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transcription {
    /// Cleaned text when available, raw text otherwise; blank counts as missing
    pub fn best_text(&self) -> Option<&str> {
        [self.clean_transcript.as_deref(), self.raw_transcript.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
    }
}
