//! Outbound integrations: the AI analysis service and SMTP.

pub mod ai;
pub mod mailer;

pub use ai::{AiClient, AiError, JobContext};
pub use mailer::{MailError, Mailer, OutgoingEmail, SmtpMailer};
