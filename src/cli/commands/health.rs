use serde_json::json;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let result = DatabaseManager::health_check().await;
    DatabaseManager::close().await;

    match result {
        Ok(()) => output_success(&output_format, "Database is reachable", Some(json!({ "database": "ok" }))),
        Err(e) => {
            output_error(&output_format, &format!("Database unavailable: {}", e), Some("DATABASE_UNAVAILABLE"))?;
            Err(anyhow::anyhow!("health check failed"))
        }
    }
}
