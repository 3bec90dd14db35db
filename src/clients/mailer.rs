use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::info;

const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP settings are not configured")]
    NotConfigured,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Connection settings, read from `system_settings` at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

impl SmtpSettings {
    pub fn ensure_configured(&self) -> Result<(), MailError> {
        let missing = [&self.host, &self.username, &self.password]
            .iter()
            .any(|v| v.trim().is_empty());
        if missing {
            return Err(MailError::NotConfigured);
        }
        Ok(())
    }

    /// Implicit TLS on 465, STARTTLS everywhere else
    pub fn implicit_tls(&self) -> bool {
        self.port == IMPLICIT_TLS_PORT
    }

    fn sender(&self) -> Result<Mailbox, MailError> {
        let address = self
            .from_email
            .parse()
            .map_err(|_| MailError::InvalidAddress(self.from_email.clone()))?;
        let name = Some(self.from_name.clone()).filter(|n| !n.trim().is_empty());
        Ok(Mailbox::new(name, address))
    }
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingEmail {
    fn into_message(self, settings: &SmtpSettings) -> Result<Message, MailError> {
        let to: Mailbox = self
            .to
            .parse()
            .map_err(|_| MailError::InvalidAddress(self.to.clone()))?;

        Ok(Message::builder()
            .from(settings.sender()?)
            .to(to)
            .subject(self.subject)
            .multipart(MultiPart::alternative_plain_html(self.text, self.html))?)
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, settings: &SmtpSettings, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Sends through the SMTP relay named in the settings.
#[derive(Debug, Clone, Default)]
pub struct SmtpMailer;

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, settings: &SmtpSettings, email: OutgoingEmail) -> Result<(), MailError> {
        settings.ensure_configured()?;
        let recipient = email.to.clone();
        let message = email.into_message(settings)?;

        let builder = if settings.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        };
        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(settings.username.clone(), settings.password.clone()))
            .build();

        transport.send(message).await?;
        info!("Sent email to {}", recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".into(),
            port: 587,
            username: "mailer".into(),
            password: "secret".into(),
            from_email: "noreply@example.com".into(),
            from_name: "SmartRecruit AI".into(),
        }
    }

    #[test]
    fn blank_credentials_are_not_configured() {
        let mut s = settings();
        assert!(s.ensure_configured().is_ok());
        s.password = String::new();
        assert!(matches!(s.ensure_configured(), Err(MailError::NotConfigured)));
    }

    #[test]
    fn tls_mode_follows_port() {
        let mut s = settings();
        assert!(!s.implicit_tls());
        s.port = 465;
        assert!(s.implicit_tls());
    }

    #[test]
    fn builds_multipart_message() {
        let email = OutgoingEmail {
            to: "candidate@example.com".into(),
            subject: "Interview Invitation - Backend Engineer".into(),
            text: "plain".into(),
            html: "<p>html</p>".into(),
        };
        let raw = String::from_utf8(email.into_message(&settings()).unwrap().formatted()).unwrap();
        assert!(raw.contains("Subject: Interview Invitation - Backend Engineer"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn rejects_bad_recipient() {
        let email = OutgoingEmail {
            to: "not-an-address".into(),
            subject: "s".into(),
            text: String::new(),
            html: String::new(),
        };
        assert!(matches!(email.into_message(&settings()), Err(MailError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn unconfigured_send_fails_before_connecting() {
        let mut s = settings();
        s.host = " ".into();
        let email = OutgoingEmail {
            to: "candidate@example.com".into(),
            subject: "s".into(),
            text: String::new(),
            html: String::new(),
        };
        assert!(matches!(SmtpMailer.send(&s, email).await, Err(MailError::NotConfigured)));
    }
}
