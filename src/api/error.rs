//! Errors surfaced by the request dispatcher

use reqwest::StatusCode;
use thiserror::Error;

/// Failure outcome of a dispatched request.
///
/// The dispatcher never retries or reinterprets these; they reach the caller
/// exactly as the HTTP layer reported them.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request payload could not be serialized
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A resource name that cannot address a single resource path segment
    #[error("invalid resource name: {0:?}")]
    InvalidName(String),

    /// The base URL and relative path did not form a valid URL
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// Connection, TLS or body-transfer failure
    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("API request failed: {status}")]
    Status { status: StatusCode, body: String },

    /// The response body was not valid JSON
    #[error("failed to parse response JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// Format an API error for display
/// Security: Maps known statuses to generic messages so server internals stay out of the terminal
pub fn format_api_error(error: &ApiError) -> String {
    if let Some(status) = error.status() {
        match status.as_u16() {
            400 => return "Invalid request. Check your parameters.".to_string(),
            401 | 403 => return "The API refused the request. Check server access rules.".to_string(),
            404 => return "Resource not found.".to_string(),
            409 => {
                return "Resource conflict. The resource may already exist or be in use."
                    .to_string()
            }
            429 => return "Rate limit exceeded. Please try again later.".to_string(),
            500..=599 => {
                return "Halyard API temporarily unavailable. Please try again.".to_string()
            }
            _ => {}
        }
    }

    if matches!(error, ApiError::Transport(_)) {
        return "Request failed. Check your network connection and the base URL.".to_string();
    }

    // Truncate long error messages and remove potential sensitive data
    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(code: u16) -> ApiError {
        ApiError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn test_status_is_exposed() {
        assert_eq!(status_error(404).status(), Some(StatusCode::NOT_FOUND));
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(ApiError::Decode(decode).status(), None);
    }

    #[test]
    fn test_format_known_statuses() {
        assert_eq!(format_api_error(&status_error(404)), "Resource not found.");
        assert!(format_api_error(&status_error(503)).contains("temporarily unavailable"));
        assert!(format_api_error(&status_error(409)).contains("conflict"));
    }

    #[test]
    fn test_format_unknown_status_falls_back_to_message() {
        assert_eq!(
            format_api_error(&status_error(418)),
            "API request failed: 418 I'm a teapot"
        );
    }

    #[test]
    fn test_format_truncates_long_messages() {
        let err = ApiError::Url(url::ParseError::RelativeUrlWithoutBase);
        let formatted = format_api_error(&err);
        assert!(formatted.len() <= 83);
        assert!(formatted.starts_with("invalid request URL"));
    }
}
