use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobForm {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub status: String,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub requirements: Option<Value>,
    pub benefits: Option<Value>,
    pub deadline: Option<DateTime<Utc>>,
    pub hiring_manager_name: Option<String>,
    pub created_by: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub evaluation_criteria: Value,
    pub assignment_enabled: bool,
    pub assignment_required: bool,
    pub assignment_type: Option<String>,
    pub assignment_description: Option<String>,
    pub assignment_weight: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobForm {
    pub const COLUMNS: &'static str = "id, title, description, department, location, type, status, \
        salary_min, salary_max, salary_currency, requirements, benefits, deadline, hiring_manager_name, \
        created_by, organization_id, evaluation_criteria, assignment_enabled, assignment_required, \
        assignment_type, assignment_description, assignment_weight, created_at, updated_at";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub job_form_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,
    pub label: String,
    pub required: bool,
    pub page_number: i32,
    pub config: Value,
    pub order_index: i32,
}

/// Canonical question kinds; stored `type` strings are normalized into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Number,
    Textarea,
    Voice,
    File,
    Url,
    Select,
}

impl QuestionType {
    /// Unknown types fall back to plain text
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "text" | "short_text" => QuestionType::Text,
            "number" => QuestionType::Number,
            "textarea" | "long_text" => QuestionType::Textarea,
            "voice" | "audio" | "voice_recording" => QuestionType::Voice,
            "file" | "file_upload" => QuestionType::File,
            "url" | "link" => QuestionType::Url,
            "select" | "dropdown" | "multiple_choice" => QuestionType::Select,
            _ => QuestionType::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Number => "number",
            QuestionType::Textarea => "textarea",
            QuestionType::Voice => "voice",
            QuestionType::File => "file",
            QuestionType::Url => "url",
            QuestionType::Select => "select",
        }
    }
}

impl Question {
    pub fn normalized_type(&self) -> QuestionType {
        QuestionType::normalize(&self.question_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_aliases() {
        assert_eq!(QuestionType::normalize("short_text"), QuestionType::Text);
        assert_eq!(QuestionType::normalize("LONG_TEXT"), QuestionType::Textarea);
        assert_eq!(QuestionType::normalize("voice_recording"), QuestionType::Voice);
        assert_eq!(QuestionType::normalize("file_upload"), QuestionType::File);
        assert_eq!(QuestionType::normalize("link"), QuestionType::Url);
        assert_eq!(QuestionType::normalize("multiple_choice"), QuestionType::Select);
        assert_eq!(QuestionType::normalize("number"), QuestionType::Number);
    }

    #[test]
    fn unknown_types_are_text() {
        assert_eq!(QuestionType::normalize("signature"), QuestionType::Text);
        assert_eq!(QuestionType::normalize(""), QuestionType::Text);
    }
}
