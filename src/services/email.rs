use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::authz::{authorize, ops, Session};
use crate::clients::mailer::{Mailer, OutgoingEmail};
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::settings::load_settings;
use crate::services::validation::ValidationError;

const FOOTER_INVITATION: &str = "This is an automated message from SmartRecruit AI system.";
const FOOTER_CONFIRMATION: &str = "This is an automated confirmation message from SmartRecruit AI system.";

/// Escape text interpolated into HTML bodies
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn optional_line(label: &str, value: Option<&str>) -> (String, String) {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => (
            format!("<p><strong>{}:</strong> {}</p>", label, escape_html(v)),
            format!("{}: {}\n", label, v),
        ),
        None => (String::new(), String::new()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterviewInvitation {
    pub candidate_email: String,
    pub candidate_name: String,
    pub job_title: String,
    pub interview_date: String,
    pub interview_time: String,
    pub interview_location: Option<String>,
    pub additional_notes: Option<String>,
}

impl InterviewInvitation {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("candidate_email", &self.candidate_email, "Candidate email is required"),
            ("candidate_name", &self.candidate_name, "Candidate name is required"),
            ("job_title", &self.job_title, "Job title is required"),
            ("interview_date", &self.interview_date, "Interview date is required"),
            ("interview_time", &self.interview_time, "Interview time is required"),
        ];
        match required.iter().find(|(_, value, _)| value.trim().is_empty()) {
            Some((field, _, message)) => Err(ValidationError::new(*field, *message)),
            None => Ok(()),
        }
    }

    pub fn render(&self) -> OutgoingEmail {
        let subject = format!("Interview Invitation - {}", self.job_title);
        let (location_html, location_text) = optional_line("Location", self.interview_location.as_deref());
        let (notes_html, notes_text) = optional_line("Notes", self.additional_notes.as_deref());

        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2563eb;">Interview Invitation</h2>
  <p>Dear {name},</p>
  <p>We are pleased to invite you for an interview for the position of <strong>{job}</strong>.</p>
  <div style="background-color: #f8fafc; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h3 style="margin-top: 0; color: #1e293b;">Interview Details</h3>
    <p><strong>Date:</strong> {date}</p>
    <p><strong>Time:</strong> {time}</p>
    {location}{notes}
  </div>
  <p>Please confirm your attendance by replying to this email.</p>
  <p>We look forward to meeting with you.</p>
  <hr style="border: none; border-top: 1px solid #e2e8f0; margin: 30px 0;">
  <p style="color: #64748b; font-size: 14px;">{footer}</p>
</div>"#,
            name = escape_html(&self.candidate_name),
            job = escape_html(&self.job_title),
            date = escape_html(&self.interview_date),
            time = escape_html(&self.interview_time),
            location = location_html,
            notes = notes_html,
            footer = FOOTER_INVITATION,
        );

        let text = format!(
            "{subject}\n\nDear {name},\n\nWe are pleased to invite you for an interview for the position of {job}.\n\n\
             Interview Details:\nDate: {date}\nTime: {time}\n{location}{notes}\n\
             Please confirm your attendance by replying to this email.\n\nWe look forward to meeting with you.\n\n---\n{footer}\n",
            subject = subject,
            name = self.candidate_name,
            job = self.job_title,
            date = self.interview_date,
            time = self.interview_time,
            location = location_text,
            notes = notes_text,
            footer = FOOTER_INVITATION,
        );

        OutgoingEmail {
            to: self.candidate_email.trim().to_string(),
            subject,
            text,
            html,
        }
    }
}

/// One submitted answer as shown back to the candidate
#[derive(Debug, Clone)]
pub struct ConfirmationAnswer {
    pub value: Option<String>,
    pub voice_data: Option<Value>,
}

impl ConfirmationAnswer {
    fn display(&self) -> Option<String> {
        if let Some(voice) = self.voice_data.as_ref().filter(|v| !v.is_null()) {
            let url = voice
                .get("audio_url")
                .and_then(Value::as_str)
                .unwrap_or("Audio file attached");
            return Some(format!("Voice Response: {}", url));
        }
        self.value.clone().filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationConfirmation {
    pub candidate_email: String,
    pub candidate_name: String,
    pub job_title: String,
    pub job_description: Option<String>,
    pub answers: Vec<ConfirmationAnswer>,
}

impl ApplicationConfirmation {
    pub fn render(&self) -> OutgoingEmail {
        let subject = format!("Application Confirmation - {}", self.job_title);
        let responses: Vec<String> = self.answers.iter().filter_map(ConfirmationAnswer::display).collect();
        let (description_html, description_text) = optional_line("Description", self.job_description.as_deref());

        let (responses_html, responses_text) = if responses.is_empty() {
            (String::new(), String::new())
        } else {
            let escaped: Vec<String> = responses.iter().map(|r| escape_html(r)).collect();
            (
                format!(
                    "<p><strong>Your Responses:</strong></p><div style=\"background-color: white; padding: 15px; border-radius: 5px; margin-top: 10px;\">{}</div>",
                    escaped.join("<br>")
                ),
                format!("Your Responses:\n{}\n", responses.join("\n")),
            )
        };

        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2563eb;">Application Received</h2>
  <p>Dear {name},</p>
  <p>Thank you for submitting your application for the position of <strong>{job}</strong>.</p>
  <div style="background-color: #f8fafc; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h3 style="margin-top: 0; color: #1e293b;">Application Details</h3>
    <p><strong>Position:</strong> {job}</p>
    {description}{responses}
  </div>
  <p>We have received your application and will review it carefully. If your qualifications match our requirements, we will contact you for the next steps.</p>
  <p>Thank you again for your interest in joining our team.</p>
  <hr style="border: none; border-top: 1px solid #e2e8f0; margin: 30px 0;">
  <p style="color: #64748b; font-size: 14px;">{footer}</p>
</div>"#,
            name = escape_html(&self.candidate_name),
            job = escape_html(&self.job_title),
            description = description_html,
            responses = responses_html,
            footer = FOOTER_CONFIRMATION,
        );

        let text = format!(
            "{subject}\n\nDear {name},\n\nThank you for submitting your application for the position of {job}.\n\n\
             Application Details:\nPosition: {job}\n{description}{responses}\n\
             We have received your application and will review it carefully. If your qualifications match our requirements, we will contact you for the next steps.\n\n\
             Thank you again for your interest in joining our team.\n\n---\n{footer}\n",
            subject = subject,
            name = self.candidate_name,
            job = self.job_title,
            description = description_text,
            responses = responses_text,
            footer = FOOTER_CONFIRMATION,
        );

        OutgoingEmail {
            to: self.candidate_email.trim().to_string(),
            subject,
            text,
            html,
        }
    }
}

/// Send a candidate-facing email with the stored SMTP settings, no session required.
pub async fn send_with_settings(pool: &PgPool, mailer: &dyn Mailer, email: OutgoingEmail) -> Result<(), ApiError> {
    let settings = load_settings(pool).await;
    mailer.send(&settings.email.smtp(), email).await?;
    Ok(())
}

pub struct EmailService {
    pool: PgPool,
}

impl EmailService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self { pool: DatabaseManager::pool().await? })
    }

    pub async fn send_interview_invitation(
        &self,
        session: Option<&Session>,
        mailer: &dyn Mailer,
        invitation: &InterviewInvitation,
    ) -> Result<(), ApiError> {
        authorize(session, &ops::SEND_INTERVIEW_INVITATION)?;
        invitation.validate()?;
        send_with_settings(&self.pool, mailer, invitation.render()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invitation() -> InterviewInvitation {
        InterviewInvitation {
            candidate_email: "ada@example.com".into(),
            candidate_name: "Ada <Lovelace>".into(),
            job_title: "Backend Engineer".into(),
            interview_date: "2026-11-02".into(),
            interview_time: "10:00".into(),
            interview_location: Some("Room 4".into()),
            additional_notes: None,
        }
    }

    #[test]
    fn invitation_subject_and_escaping() {
        let email = invitation().render();
        assert_eq!(email.subject, "Interview Invitation - Backend Engineer");
        assert!(email.html.contains("Dear Ada &lt;Lovelace&gt;,"));
        assert!(email.text.contains("Dear Ada <Lovelace>,"));
        assert!(email.html.contains("<strong>Location:</strong> Room 4"));
        assert!(!email.html.contains("Notes:"));
    }

    #[test]
    fn invitation_requires_fields() {
        let mut inv = invitation();
        inv.interview_time = " ".into();
        let err = inv.validate().unwrap_err();
        assert_eq!(err.field, "interview_time");
        assert_eq!(err.message, "Interview time is required");
    }

    #[test]
    fn confirmation_lists_responses() {
        let email = ApplicationConfirmation {
            candidate_email: "ada@example.com".into(),
            candidate_name: "Ada".into(),
            job_title: "Backend Engineer".into(),
            job_description: None,
            answers: vec![
                ConfirmationAnswer { value: Some("Five years of Rust".into()), voice_data: None },
                ConfirmationAnswer { value: None, voice_data: Some(json!({"audio_url": "https://cdn.example.com/a.webm"})) },
                ConfirmationAnswer { value: Some("   ".into()), voice_data: None },
            ],
        }
        .render();
        assert_eq!(email.subject, "Application Confirmation - Backend Engineer");
        assert!(email.text.contains("Your Responses:\nFive years of Rust\nVoice Response: https://cdn.example.com/a.webm\n"));
        assert!(email.html.contains("Five years of Rust<br>Voice Response"));
    }

    #[test]
    fn escapes_all_markup_characters() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
