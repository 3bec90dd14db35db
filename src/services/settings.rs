use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::authz::{authorize, ops, Role, Session};
use crate::clients::mailer::SmtpSettings;
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;

const REDACTED: &str = "********";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_name: String,
    pub from_email: String,
    pub enable_notifications: bool,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.smartrecruit.com".to_string(),
            smtp_port: 587,
            smtp_username: "noreply@smartrecruit.com".to_string(),
            smtp_password: String::new(),
            from_name: "SmartRecruit AI".to_string(),
            from_email: "noreply@smartrecruit.com".to_string(),
            enable_notifications: true,
        }
    }
}

impl EmailSettings {
    pub fn smtp(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            from_email: self.from_email.clone(),
            from_name: self.from_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub resume_parsing: bool,
    pub candidate_scoring: bool,
    pub interview_scheduling: bool,
    pub smart_matching: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PasswordPolicy {
    pub min_length: u32,
    pub require_uppercase: bool,
    pub require_numbers: bool,
    pub require_symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_numbers: true,
            require_symbols: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecuritySettings {
    pub password_policy: PasswordPolicy,
    /// Minutes
    pub session_timeout: u32,
    pub two_factor_required: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            password_policy: PasswordPolicy::default(),
            session_timeout: 480,
            two_factor_required: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub default_format: String,
    pub include_personal_data: bool,
    pub anonymize_data: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            default_format: "csv".to_string(),
            include_personal_data: false,
            anonymize_data: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    pub email: EmailSettings,
    pub ai: AiSettings,
    pub security: SecuritySettings,
    pub export: ExportSettings,
}

impl SystemSettings {
    pub const KEYS: [&'static str; 4] = ["email", "ai", "security", "export"];

    /// Overlay stored rows onto the defaults. Unknown keys and rows that do
    /// not parse are skipped; missing fields inside a section keep their default.
    pub fn from_rows(rows: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut settings = SystemSettings::default();
        for (key, value) in rows {
            // Older rows hold the section JSON-encoded as a string
            let value = match value {
                Value::String(raw) => match serde_json::from_str(&raw) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        tracing::warn!("Unparseable setting '{}': {}", key, e);
                        continue;
                    }
                },
                other => other,
            };
            let applied = match key.as_str() {
                "email" => serde_json::from_value(value).map(|v| settings.email = v),
                "ai" => serde_json::from_value(value).map(|v| settings.ai = v),
                "security" => serde_json::from_value(value).map(|v| settings.security = v),
                "export" => serde_json::from_value(value).map(|v| settings.export = v),
                _ => continue,
            };
            if let Err(e) = applied {
                tracing::warn!("Ignoring malformed setting '{}': {}", key, e);
            }
        }
        settings
    }

    pub fn sections(&self) -> Result<Vec<(&'static str, Value)>, serde_json::Error> {
        Ok(vec![
            ("email", serde_json::to_value(&self.email)?),
            ("ai", serde_json::to_value(&self.ai)?),
            ("security", serde_json::to_value(&self.security)?),
            ("export", serde_json::to_value(&self.export)?),
        ])
    }

    pub fn redacted(mut self) -> Self {
        if !self.email.smtp_password.is_empty() {
            self.email.smtp_password = REDACTED.to_string();
        }
        self
    }
}

/// Current settings without a session check, for internal senders.
/// Falls back to defaults when the table cannot be read.
pub async fn load_settings(pool: &PgPool) -> SystemSettings {
    let rows = sqlx::query_as::<_, (String, Value)>("SELECT key, value FROM system_settings")
        .fetch_all(pool)
        .await;

    match rows {
        Ok(rows) => SystemSettings::from_rows(rows),
        Err(e) => {
            tracing::error!("Error fetching system settings: {}", e);
            SystemSettings::default()
        }
    }
}

pub struct SettingsService {
    pool: PgPool,
}

impl SettingsService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    /// SMTP password is only shown to super-admins
    pub async fn get(&self, session: Option<&Session>) -> Result<SystemSettings, ApiError> {
        let session = authorize(session, &ops::GET_SETTINGS)?;
        let settings = load_settings(&self.pool).await;
        Ok(match session.role {
            Role::SuperAdmin => settings,
            Role::Admin | Role::Reviewer => settings.redacted(),
        })
    }

    pub async fn update(&self, session: Option<&Session>, settings: &SystemSettings) -> Result<SystemSettings, ApiError> {
        let session = authorize(session, &ops::UPDATE_SETTINGS)?;

        let sections = settings
            .sections()
            .map_err(|e| ApiError::bad_request(format!("Invalid settings: {}", e)))?;

        for (key, value) in sections {
            sqlx::query(
                "INSERT INTO system_settings (key, value, updated_by, updated_at) VALUES ($1, $2, $3, now()) \
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_by = EXCLUDED.updated_by, updated_at = now()",
            )
            .bind(key)
            .bind(value)
            .bind(session.user_id)
            .execute(&self.pool)
            .await?;
        }

        tracing::info!("System settings updated by {}", session.user_id);
        Ok(load_settings(&self.pool).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_values() {
        let s = SystemSettings::default();
        assert_eq!(s.email.smtp_host, "smtp.smartrecruit.com");
        assert_eq!(s.email.smtp_port, 587);
        assert_eq!(s.email.from_email, "noreply@smartrecruit.com");
        assert!(s.email.smtp_password.is_empty());
        assert!(s.email.enable_notifications);
        assert_eq!(s.security.password_policy.min_length, 8);
        assert_eq!(s.security.session_timeout, 480);
        assert_eq!(s.export.default_format, "csv");
        assert!(s.export.anonymize_data);
    }

    #[test]
    fn stored_rows_override_sections() {
        let rows = vec![
            ("email".to_string(), json!({"smtpHost": "mail.example.com", "smtpPort": 465})),
            ("export".to_string(), Value::String(r#"{"defaultFormat":"xlsx"}"#.to_string())),
            ("unknown".to_string(), json!({"x": 1})),
        ];
        let s = SystemSettings::from_rows(rows);
        assert_eq!(s.email.smtp_host, "mail.example.com");
        assert_eq!(s.email.smtp_port, 465);
        // Fields missing from the stored section keep their defaults
        assert_eq!(s.email.from_name, "SmartRecruit AI");
        assert_eq!(s.export.default_format, "xlsx");
        assert_eq!(s.security, SecuritySettings::default());
    }

    #[test]
    fn malformed_rows_are_ignored() {
        let rows = vec![
            ("email".to_string(), json!({"smtpPort": "not a port"})),
            ("ai".to_string(), Value::String("{broken".to_string())),
        ];
        assert_eq!(SystemSettings::from_rows(rows), SystemSettings::default());
    }

    #[test]
    fn camel_case_wire_format() {
        let value = serde_json::to_value(SystemSettings::default()).unwrap();
        assert_eq!(value["email"]["fromName"], "SmartRecruit AI");
        assert_eq!(value["security"]["passwordPolicy"]["requireUppercase"], true);
    }

    #[test]
    fn redaction_hides_password_only_when_set() {
        let mut s = SystemSettings::default();
        assert_eq!(s.clone().redacted().email.smtp_password, "");
        s.email.smtp_password = "hunter2".into();
        assert_eq!(s.redacted().email.smtp_password, "********");
    }
}
