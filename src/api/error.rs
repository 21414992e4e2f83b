//! API error definitions
//!
//! Every failure surfaced by the client is one of these variants. Errors that
//! originate from an HTTP response keep the status code and the raw response
//! body so callers can inspect exactly what the server said.

use thiserror::Error;

/// Result type alias for boxmeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Base error type for all boxmeta errors
#[derive(Error, Debug)]
pub enum Error {
    /// The requested resource does not exist (404)
    #[error("Resource not found (404): {body}")]
    NotFound { body: String },

    /// The resource already exists or is in use (409)
    #[error("Conflict (409): {message}")]
    Conflict { message: String, body: String },

    /// The server rejected the request payload (any other 4xx)
    #[error("Request rejected ({status}): {body}")]
    Validation { status: u16, body: String },

    /// Any other non-success response
    #[error("API request failed ({status}): {body}")]
    Api { status: u16, body: String },

    /// Response body does not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// No response was received
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Input rejected before any request was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration or credential resolution failed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build the error for a non-success HTTP response
    pub fn from_response(status: u16, body: String) -> Self {
        match status {
            404 => Error::NotFound { body },
            409 => {
                let message = server_message(&body).unwrap_or_else(|| body.clone());
                Error::Conflict { message, body }
            }
            400..=499 => Error::Validation { status, body },
            _ => Error::Api { status, body },
        }
    }

    /// HTTP status code, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::NotFound { .. } => Some(404),
            Error::Conflict { .. } => Some(409),
            Error::Validation { status, .. } | Error::Api { status, .. } => Some(*status),
            Error::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Raw response body, verbatim, when the error came from a response
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Error::NotFound { body }
            | Error::Conflict { body, .. }
            | Error::Validation { body, .. }
            | Error::Api { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Pull the human readable `message` out of an error body, if there is one
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_404_maps_to_not_found() {
        let err = Error::from_response(404, r#"{"code":"not_found"}"#.to_string());
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.response_body(), Some(r#"{"code":"not_found"}"#));
    }

    #[test]
    fn test_409_extracts_server_message() {
        let body = r#"{"type":"error","status":409,"code":"conflict","message":"Template key already exists in this scope"}"#;
        let err = Error::from_response(409, body.to_string());
        match &err {
            Error::Conflict { message, body: raw } => {
                assert_eq!(message, "Template key already exists in this scope");
                assert_eq!(raw, body);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_409_without_json_keeps_body_as_message() {
        let err = Error::from_response(409, "conflict".to_string());
        assert!(err.to_string().contains("conflict"));
    }

    #[test]
    fn test_other_4xx_is_validation_and_5xx_is_api() {
        assert!(matches!(
            Error::from_response(400, String::new()),
            Error::Validation { status: 400, .. }
        ));
        assert!(matches!(
            Error::from_response(503, String::new()),
            Error::Api { status: 503, .. }
        ));
    }

    #[test]
    fn test_local_errors_have_no_status() {
        assert_eq!(Error::InvalidInput("x".into()).status(), None);
        assert_eq!(Error::Decode("x".into()).response_body(), None);
    }
}
