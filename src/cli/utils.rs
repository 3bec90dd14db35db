use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Print a serializable value in the selected format
pub fn output_value<T: Serialize>(output_format: &OutputFormat, value: &T) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    let mut response = json!({
        "success": true,
        "message": message
    });
    if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
        target.extend(extra);
    }

    match output_format {
        OutputFormat::Text => println!("✓ {}", message),
        _ => output_value(output_format, &response)?,
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    let mut response = json!({
        "success": false,
        "error": message
    });
    if let Some(code) = error_code {
        response["error_code"] = json!(code);
    }

    match output_format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        _ => output_value(output_format, &response)?,
    }
    Ok(())
}
