//! Error types for the passport editor.

use std::time::Duration;

/// Maximum length of a remote diagnostic kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while editing a passport photo.
#[derive(Debug, thiserror::Error)]
pub enum PassportError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Wait suggested by the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// Billing is not enabled for the API key.
    #[error("billing error: {0}")]
    Billing(String),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The selected file is not a usable image.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The option exists but the active catalog does not offer it.
    #[error("option not offered: {0}")]
    UnsupportedOption(String),

    /// A generation is in flight and the session rejects the event.
    #[error("session is busy processing a generation")]
    Busy,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., saving the download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote service answered without anything usable.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl PassportError {
    /// Returns a short machine-readable name for the error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Api { .. } => "api",
            Self::RateLimited { .. } => "rate_limited",
            Self::Billing(_) => "billing",
            Self::ContentBlocked(_) => "content_blocked",
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidImage(_) => "invalid_image",
            Self::UnsupportedOption(_) => "unsupported_option",
            Self::Busy => "busy",
            Self::Network(_) => "network",
            Self::Decode(_) => "decode",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::UnexpectedResponse(_) => "unexpected_response",
        }
    }
}

/// Result type alias for passport editor operations.
pub type Result<T> = std::result::Result<T, PassportError>;

/// Reads a `Retry-After` header expressed in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Reduces a remote error body to a single readable line.
///
/// Google APIs wrap errors as `{"error": {"message": ...}}`; when that shape is
/// present only the message is kept. Whitespace is collapsed and the result is
/// truncated on a char boundary.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let extracted = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| text.to_string());

    let collapsed = extracted.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PassportError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = PassportError::ContentBlocked("Safety filter triggered".into());
        assert_eq!(err.to_string(), "content blocked: Safety filter triggered");

        assert_eq!(
            PassportError::Busy.to_string(),
            "session is busy processing a generation"
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(PassportError::Auth("x".into()).kind(), "auth");
        assert_eq!(
            PassportError::RateLimited { retry_after: None }.kind(),
            "rate_limited"
        );
        assert_eq!(PassportError::Busy.kind(), "busy");
    }

    #[test]
    fn test_sanitize_extracts_google_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.\n Please pass a valid key.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            sanitize_error_message(body),
            "API key not valid. Please pass a valid key."
        );
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(2000);
        let cleaned = sanitize_error_message(&body);
        assert_eq!(cleaned.len(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(reqwest::header::RETRY_AFTER, "17".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(17));

        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
