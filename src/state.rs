use std::sync::Arc;

use crate::clients::{AiClient, AiError, Mailer, SmtpMailer};
use crate::config::AppConfig;

/// Outbound clients shared by every handler. Database access goes through
/// `DatabaseManager` instead.
#[derive(Clone)]
pub struct AppState {
    pub ai: AiClient,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self, AiError> {
        Ok(Self {
            ai: AiClient::new(&config.ai)?,
            mailer: Arc::new(SmtpMailer::default()),
        })
    }
}
