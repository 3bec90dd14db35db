use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::authz::{authorize, ops, Session};
use crate::database::models::Assignment;
use crate::database::{DatabaseError, DatabaseManager, Repository};
use crate::error::ApiError;
use crate::services::scope::{ensure_child_in_scope, scoped_application};
use crate::services::validation::{max_chars, parse_uuid, require_url, Validated, ValidationError};

const ASSIGNMENT_COLUMNS: &str = "id, application_id, type, text_fields, link_fields, created_at";
const MAX_TEXT_CHARS: usize = 10_000;
const MAX_LINKS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    TextOnly,
    TextAndLinks,
}

impl AssignmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentType::TextOnly => "text_only",
            AssignmentType::TextAndLinks => "text_and_links",
        }
    }

    fn parse(raw: &str) -> Validated<Self> {
        match raw {
            "text_only" => Ok(AssignmentType::TextOnly),
            "text_and_links" => Ok(AssignmentType::TextAndLinks),
            _ => Err(ValidationError::new("type", "Type must be text_only or text_and_links")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssignment {
    #[serde(default)]
    pub application_id: String,
    #[serde(rename = "type", default)]
    pub assignment_type: String,
    pub text_fields: Option<String>,
    pub link_fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidAssignment {
    pub application_id: Uuid,
    pub assignment_type: AssignmentType,
    pub text_fields: Option<String>,
    pub links: Vec<String>,
}

impl ValidAssignment {
    /// Stored as a JSON array string; no links stores NULL
    fn link_json(&self) -> Option<String> {
        if self.links.is_empty() {
            return None;
        }
        serde_json::to_string(&self.links).ok()
    }
}

impl CreateAssignment {
    pub fn validate(&self) -> Validated<ValidAssignment> {
        let application_id = parse_uuid("application_id", &self.application_id, "Invalid application ID")?;
        let assignment_type = AssignmentType::parse(&self.assignment_type)?;
        if let Some(text) = &self.text_fields {
            max_chars("text_fields", text, MAX_TEXT_CHARS, "Text too long (max 10,000 characters)")?;
        }

        let raw_links = self.link_fields.as_deref().unwrap_or_default();
        let links = raw_links
            .iter()
            .map(|l| require_url("link_fields", l, "Invalid URL format"))
            .collect::<Validated<Vec<_>>>()?;
        if links.len() > MAX_LINKS {
            return Err(ValidationError::new("link_fields", "Maximum 5 links allowed"));
        }

        Ok(ValidAssignment {
            application_id,
            assignment_type,
            text_fields: self.text_fields.clone(),
            links,
        })
    }
}

/// Lenient read of the stored links: anything but a JSON array is `None`,
/// and non-string entries are skipped.
pub fn parse_links(raw: Option<&str>) -> Option<Vec<String>> {
    let raw = raw.filter(|r| !r.is_empty())?;
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentView {
    pub id: Uuid,
    pub application_id: Uuid,
    #[serde(rename = "type")]
    pub assignment_type: String,
    pub text_fields: Option<String>,
    pub link_fields: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<Assignment> for AssignmentView {
    fn from(row: Assignment) -> Self {
        Self {
            link_fields: parse_links(row.link_fields.as_deref()),
            id: row.id,
            application_id: row.application_id,
            assignment_type: row.assignment_type,
            text_fields: row.text_fields,
            created_at: row.created_at,
        }
    }
}

fn assignments(pool: &PgPool) -> Repository<'_, Assignment> {
    Repository::new("assignments", ASSIGNMENT_COLUMNS, pool)
}

pub struct AssignmentService {
    pool: PgPool,
}

impl AssignmentService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    pub async fn create(&self, session: Option<&Session>, request: &CreateAssignment) -> Result<AssignmentView, ApiError> {
        let session = authorize(session, &ops::CREATE_ASSIGNMENT)?;
        let input = request.validate()?;
        scoped_application(&self.pool, &session, input.application_id).await?;

        let sql = format!(
            "INSERT INTO assignments (application_id, type, text_fields, link_fields) VALUES ($1, $2, $3, $4) RETURNING {}",
            ASSIGNMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, Assignment>(&sql)
            .bind(input.application_id)
            .bind(input.assignment_type.as_str())
            .bind(&input.text_fields)
            .bind(input.link_json())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    /// Oldest first
    pub async fn list_for_application(&self, session: Option<&Session>, application_id: Uuid) -> Result<Vec<AssignmentView>, ApiError> {
        let session = authorize(session, &ops::LIST_ASSIGNMENTS)?;
        scoped_application(&self.pool, &session, application_id).await?;
        let rows = assignments(&self.pool).select_by_application(application_id, false).await?;
        Ok(rows.into_iter().map(AssignmentView::from).collect())
    }

    pub async fn get(&self, session: Option<&Session>, id: Uuid) -> Result<AssignmentView, ApiError> {
        let session = authorize(session, &ops::GET_ASSIGNMENT)?;
        let repo = assignments(&self.pool);
        ensure_child_in_scope(&repo, session.org_scope(), id, "Assignment not found").await?;
        Ok(repo.select_404(id, "Assignment not found").await?.into())
    }

    pub async fn delete(&self, session: Option<&Session>, id: Uuid) -> Result<Value, ApiError> {
        let session = authorize(session, &ops::DELETE_ASSIGNMENT)?;
        let repo = assignments(&self.pool);
        ensure_child_in_scope(&repo, session.org_scope(), id, "Assignment not found").await?;
        if !repo.delete(id).await? {
            return Err(ApiError::not_found("Assignment not found"));
        }
        Ok(json!({ "deleted": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: &str, links: Option<Vec<&str>>) -> CreateAssignment {
        CreateAssignment {
            application_id: Uuid::new_v4().to_string(),
            assignment_type: kind.to_string(),
            text_fields: Some("My solution".into()),
            link_fields: links.map(|l| l.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn valid_links_are_stored_as_json() {
        let valid = request("text_and_links", Some(vec!["https://github.com/a/b"])).validate().unwrap();
        assert_eq!(valid.link_json().as_deref(), Some("[\"https://github.com/a/b\"]"));
        assert_eq!(request("text_only", None).validate().unwrap().link_json(), None);
    }

    #[test]
    fn rejects_unknown_type() {
        let err = request("essay", None).validate().unwrap_err();
        assert_eq!(err.message, "Type must be text_only or text_and_links");
    }

    #[test]
    fn rejects_long_text() {
        let mut req = request("text_only", None);
        req.text_fields = Some("x".repeat(10_001));
        assert_eq!(req.validate().unwrap_err().message, "Text too long (max 10,000 characters)");
    }

    #[test]
    fn at_most_five_links() {
        let links = vec!["https://a.io"; 6];
        let err = request("text_and_links", Some(links)).validate().unwrap_err();
        assert_eq!(err.message, "Maximum 5 links allowed");
    }

    #[test]
    fn links_must_be_urls() {
        let err = request("text_and_links", Some(vec!["github"])).validate().unwrap_err();
        assert_eq!(err.field, "link_fields");
    }

    #[test]
    fn stored_links_parse_leniently() {
        assert_eq!(parse_links(Some("[\"https://a.io\", 3]")), Some(vec!["https://a.io".to_string()]));
        assert_eq!(parse_links(Some("[]")), Some(vec![]));
        assert_eq!(parse_links(Some("{\"a\": 1}")), None);
        assert_eq!(parse_links(Some("not json")), None);
        assert_eq!(parse_links(None), None);
    }
}
