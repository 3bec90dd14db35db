use uuid::Uuid;

/// First failing input rule. Only one is reported per request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

pub type Validated<T> = Result<T, ValidationError>;

pub fn parse_uuid(field: &'static str, raw: &str, message: &str) -> Validated<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::new(field, message))
}

pub fn require_url(field: &'static str, raw: &str, message: &str) -> Validated<String> {
    let trimmed = raw.trim();
    match url::Url::parse(trimmed) {
        Ok(url) if url.has_host() => Ok(trimmed.to_string()),
        _ => Err(ValidationError::new(field, message)),
    }
}

pub fn max_chars(field: &'static str, value: &str, max: usize, message: &str) -> Validated<()> {
    if value.chars().count() > max {
        return Err(ValidationError::new(field, message));
    }
    Ok(())
}

/// Trim and drop empty strings
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_need_scheme_and_host() {
        assert!(require_url("url", "https://example.com/v.mp4", "bad").is_ok());
        assert!(require_url("url", "example.com", "bad").is_err());
        assert!(require_url("url", "mailto:someone@example.com", "bad").is_err());
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert!(max_chars("notes", "ééé", 3, "too long").is_ok());
        assert!(max_chars("notes", "éééé", 3, "too long").is_err());
    }

    #[test]
    fn blank_strings_become_none() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" a ".into())), Some("a".into()));
    }
}
