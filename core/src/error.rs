//! Error types for the SeriesTrack API client.
//!
//! # Design
//! Three kinds cover every failure the server interaction can produce:
//! `Validation` (caught before dispatch, a 400, or a facade remap),
//! `Transport` (no response at all) and `Response` (a non-2xx status). The
//! remaining variants cover local codec failures and caller cancellation.
//! Retryability is derived from the variant and status alone.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the request engine, the client facade and the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// A precondition failed before dispatch, or the server rejected the
    /// input (400, or a remapped 404/409). Never carries a status.
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// No response was obtained from the server.
    #[error("{message}")]
    Transport { message: String, endpoint: String },

    /// The server answered with a non-success status.
    #[error("{message}")]
    Response {
        status: u16,
        status_text: String,
        message: String,
        endpoint: String,
    },

    /// The request payload could not be encoded to JSON.
    #[error("failed to encode request body: {0}")]
    Serialization(String),

    /// A success body could not be decoded into the expected payload.
    #[error("failed to decode response body: {0}")]
    Deserialization(String),

    /// The caller cancelled the request while an attempt or a backoff wait
    /// was pending.
    #[error("request to {endpoint} was cancelled")]
    Cancelled { endpoint: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    /// Status code of a `Response` failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Transport failures and 408/429/502/503/504 responses are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            ApiError::Response { status, .. } => {
                matches!(*status, 408 | 429 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

/// Shape of a server error body. Either field may carry the message.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    /// Extract `message` (preferred) or `error` from a JSON error body.
    /// Returns `None` when the body is not JSON or neither field is a
    /// non-empty string.
    pub fn message_from(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .message
            .filter(|m| !m.is_empty())
            .or(parsed.error.filter(|e| !e.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> ApiError {
        ApiError::Response {
            status,
            status_text: String::new(),
            message: "x".to_string(),
            endpoint: "/users/1".to_string(),
        }
    }

    #[test]
    fn retryable_statuses() {
        for status in [408, 429, 502, 503, 504] {
            assert!(response(status).is_retryable(), "{status}");
        }
        for status in [400, 401, 403, 404, 409, 500, 501, 505] {
            assert!(!response(status).is_retryable(), "{status}");
        }
    }

    #[test]
    fn transport_is_always_retryable() {
        let err = ApiError::Transport {
            message: "connection refused".to_string(),
            endpoint: "/users".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn validation_is_never_retryable() {
        assert!(!ApiError::validation("User ID is required").is_retryable());
        assert!(!ApiError::Deserialization("bad".into()).is_retryable());
        assert!(!ApiError::Cancelled { endpoint: "/x".into() }.is_retryable());
    }

    #[test]
    fn display_is_the_message() {
        let err = ApiError::invalid_field("email", "Email is required");
        assert_eq!(err.to_string(), "Email is required");
        assert_eq!(response(503).to_string(), "x");
    }

    #[test]
    fn error_body_prefers_message_over_error() {
        assert_eq!(
            ErrorBody::message_from(r#"{"message":"bad input","error":"other"}"#).as_deref(),
            Some("bad input")
        );
        assert_eq!(
            ErrorBody::message_from(r#"{"error":"User already exists"}"#).as_deref(),
            Some("User already exists")
        );
    }

    #[test]
    fn error_body_absent_fields_are_none() {
        assert_eq!(ErrorBody::message_from(r#"{"detail":"x"}"#), None);
        assert_eq!(ErrorBody::message_from(r#"{"message":""}"#), None);
        assert_eq!(ErrorBody::message_from(r#"{"message":42}"#), None);
        assert_eq!(ErrorBody::message_from("<html>oops</html>"), None);
        assert_eq!(ErrorBody::message_from(""), None);
    }
}
