use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AiConfig;

const ANALYSIS_PATH: &str = "/api/comprehensive-analysis";
const DEFAULT_POSITION: &str = "Software Engineer";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("BACKEND_API_KEY (or AI_API_KEY) is not set")]
    NotConfigured,

    #[error("AI Server request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI Server error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("{0}")]
    Rejected(String),

    #[error("AI Server returned no analysis")]
    EmptyAnalysis,
}

/// What the analysis service is told about the role being interviewed for
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobContext {
    pub position: String,
    pub required_skills: Vec<String>,
    pub key_topics: Vec<String>,
}

impl JobContext {
    /// Build from a job form's title and `requirements` JSON (an array of strings, or absent).
    pub fn from_job(title: Option<&str>, requirements: Option<&Value>) -> Self {
        let position = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_POSITION)
            .to_string();
        let required_skills: Vec<String> = requirements
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            position,
            key_topics: required_skills.clone(),
            required_skills,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalysisRequest<'a> {
    transcript: &'a str,
    job_description: &'a JobContext,
}

/// Client for the remote interview analysis service.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run the comprehensive analysis for an interview transcript.
    pub async fn analyze_transcript(&self, transcript: &str, job: &JobContext) -> Result<Value, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::NotConfigured)?;
        let url = format!("{}{}", self.base_url, ANALYSIS_PATH);
        debug!("Sending interview transcript to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .json(&AnalysisRequest { transcript, job_description: job })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("AI Server responded with status {}", status);
            return Err(AiError::Api { status: status.as_u16(), body });
        }

        let payload: Value = response.json().await?;
        parse_analysis(payload)
    }
}

/// Pull the analysis out of the service's envelope: `{success, comprehensive_analysis | analysis, message}`.
pub fn parse_analysis(mut payload: Value) -> Result<Value, AiError> {
    let success = payload.get("success").and_then(Value::as_bool).unwrap_or(false);
    if !success {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Analysis failed")
            .to_string();
        return Err(AiError::Rejected(message));
    }

    for key in ["comprehensive_analysis", "analysis"] {
        if let Some(analysis) = payload.get_mut(key).map(Value::take) {
            if !analysis.is_null() {
                return Ok(analysis);
            }
        }
    }
    Err(AiError::EmptyAnalysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_comprehensive_analysis() {
        let payload = json!({
            "success": true,
            "comprehensive_analysis": {"overall_score": 82},
            "analysis": {"overall_score": 10}
        });
        assert_eq!(parse_analysis(payload).unwrap()["overall_score"], 82);
    }

    #[test]
    fn falls_back_to_analysis_key() {
        let payload = json!({"success": true, "analysis": {"summary": "ok"}});
        assert_eq!(parse_analysis(payload).unwrap()["summary"], "ok");
    }

    #[test]
    fn unsuccessful_payload_is_rejected_with_message() {
        let err = parse_analysis(json!({"success": false, "message": "transcript too short"})).unwrap_err();
        assert_eq!(err.to_string(), "transcript too short");
        assert!(matches!(parse_analysis(json!({})), Err(AiError::Rejected(_))));
    }

    #[test]
    fn success_without_analysis_is_empty() {
        assert!(matches!(
            parse_analysis(json!({"success": true, "analysis": null})),
            Err(AiError::EmptyAnalysis)
        ));
    }

    #[test]
    fn api_error_text() {
        let err = AiError::Api { status: 500, body: "boom".into() };
        assert_eq!(err.to_string(), "AI Server error: 500 - boom");
    }

    #[test]
    fn job_context_from_requirements() {
        let requirements = json!(["Rust", "Postgres", 3]);
        let ctx = JobContext::from_job(Some("Backend Engineer"), Some(&requirements));
        assert_eq!(ctx.position, "Backend Engineer");
        assert_eq!(ctx.required_skills, vec!["Rust", "Postgres"]);

        let ctx = JobContext::from_job(Some("  "), None);
        assert_eq!(ctx.position, "Software Engineer");
        assert!(ctx.key_topics.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let client = AiClient::new(&AiConfig {
            server_url: "http://localhost:5001/".into(),
            api_key: None,
            timeout_secs: 1,
        })
        .unwrap();
        assert!(!client.is_configured());
        let err = client.analyze_transcript("hello", &JobContext::default()).await.unwrap_err();
        assert!(matches!(err, AiError::NotConfigured));
    }
}
