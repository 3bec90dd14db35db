use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

pub fn handle(user: Uuid, email: Option<String>, hours: Option<i64>, output_format: OutputFormat) -> anyhow::Result<()> {
    let hours = hours.unwrap_or(config().security.jwt_expiry_hours as i64);
    let claims = Claims::with_expiry(user, email, hours);
    let token = generate_jwt(&claims)?;

    match output_format {
        // Bare token so it can be captured with $(smartrecruit token ...)
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
        _ => output_success(
            &output_format,
            "Token issued",
            Some(json!({ "token": token, "sub": user, "expires_at": claims.exp })),
        ),
    }
}
