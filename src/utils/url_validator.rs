//! 目标 URL 校验

use url::Url;

/// 目标 URL 最大长度
pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    Empty,
    TooLong(usize),
    BlockedScheme(&'static str),
    UnsupportedScheme(String),
    Malformed(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "URL cannot be empty"),
            Self::TooLong(len) => write!(
                f,
                "URL is too long ({} characters, maximum is {})",
                len, MAX_URL_LENGTH
            ),
            Self::BlockedScheme(scheme) => write!(f, "URL scheme '{}' is not allowed", scheme),
            Self::UnsupportedScheme(scheme) => write!(
                f,
                "Unsupported URL scheme '{}', only http:// and https:// are allowed",
                scheme
            ),
            Self::Malformed(msg) => write!(f, "Invalid URL: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

impl From<UrlValidationError> for crate::errors::QuickslugError {
    fn from(err: UrlValidationError) -> Self {
        crate::errors::QuickslugError::validation(err.to_string())
    }
}

const BLOCKED_SCHEMES: &[&str] = &["javascript", "data", "file", "vbscript", "about", "blob"];

/// 校验目标 URL，返回去除首尾空白后的地址
pub fn validate_url(input: &str) -> Result<String, UrlValidationError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong(trimmed.len()));
    }

    let scheme = trimmed
        .split_once(':')
        .map(|(s, _)| s.to_ascii_lowercase())
        .unwrap_or_default();

    if let Some(blocked) = BLOCKED_SCHEMES.iter().find(|b| **b == scheme) {
        return Err(UrlValidationError::BlockedScheme(blocked));
    }

    let lower = trimmed.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(UrlValidationError::UnsupportedScheme(scheme));
    }

    let parsed = Url::parse(trimmed).map_err(|e| UrlValidationError::Malformed(e.to_string()))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::Malformed("missing host".to_string()));
    }

    Ok(trimmed.to_string())
}
