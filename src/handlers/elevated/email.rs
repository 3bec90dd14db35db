// handlers/elevated/email.rs - POST /api/email/interview-invitation handler

use axum::extract::State;
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::services::email::{EmailService, InterviewInvitation};
use crate::state::AppState;

pub async fn send_interview_invitation(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Json(body): Json<InterviewInvitation>,
) -> ApiResult<Value> {
    let service = EmailService::new().await?;
    service
        .send_interview_invitation(session.get(), state.mailer.as_ref(), &body)
        .await?;
    Ok(ApiResponse::success(json!({ "sent": true })))
}
