//! Stable error codes and the structured wire error type.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable error codes carried in structured errors.
///
/// These codes are part of the protocol contract and must remain stable
/// across versions. A non-2xx response body is only treated as a structured
/// error when it deserializes into a known code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Local request construction
    InvalidRequestParams,

    // Transport execution
    RequestTimeout,
    HttpRequestFailed,
    InvalidResponseBody,
    UnsupportedMediaType,

    // Service-declared
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    RateLimited,
    InternalError,
}

impl ErrorCode {
    /// Returns whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RequestTimeout | ErrorCode::RateLimited | ErrorCode::InternalError
        )
    }

    /// HTTP status code a server uses when declaring this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InvalidRequestParams | ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::RequestTimeout => 408,
            ErrorCode::Conflict => 409,
            ErrorCode::UnsupportedMediaType => 415,
            ErrorCode::RateLimited => 429,
            ErrorCode::HttpRequestFailed => 502,
            ErrorCode::InvalidResponseBody | ErrorCode::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::InvalidRequestParams => write!(f, "INVALID_REQUEST_PARAMS"),
            ErrorCode::RequestTimeout => write!(f, "REQUEST_TIMEOUT"),
            ErrorCode::HttpRequestFailed => write!(f, "HTTP_REQUEST_FAILED"),
            ErrorCode::InvalidResponseBody => write!(f, "INVALID_RESPONSE_BODY"),
            ErrorCode::UnsupportedMediaType => write!(f, "UNSUPPORTED_MEDIA_TYPE"),
            ErrorCode::BadRequest => write!(f, "BAD_REQUEST"),
            ErrorCode::Unauthorized => write!(f, "UNAUTHORIZED"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::Conflict => write!(f, "CONFLICT"),
            ErrorCode::RateLimited => write!(f, "RATE_LIMITED"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Structured call error.
///
/// This is both the in-process error value and the wire shape a service
/// declares in a non-2xx response body; remote-declared code and message are
/// propagated verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("[{code}] {message}")]
pub struct StatusError {
    /// Stable error code.
    pub code: ErrorCode,

    /// Human-readable error message.
    pub message: String,

    /// Additional context, e.g. the underlying transport error.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
}

impl StatusError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            desc: String::new(),
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    /// Returns whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_retryable() {
        assert!(ErrorCode::RequestTimeout.is_retryable());
        assert!(ErrorCode::RateLimited.is_retryable());
        assert!(ErrorCode::InternalError.is_retryable());

        assert!(!ErrorCode::InvalidRequestParams.is_retryable());
        assert!(!ErrorCode::HttpRequestFailed.is_retryable());
        assert!(!ErrorCode::NotFound.is_retryable());
        assert!(!ErrorCode::Conflict.is_retryable());
    }

    #[test]
    fn test_status_error_round_trip() {
        let err = StatusError::new(ErrorCode::NotFound, "no such user").with_desc("id=42");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains(r#""code":"NOT_FOUND""#));

        let parsed: StatusError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_unstructured_body_does_not_parse() {
        assert!(serde_json::from_str::<StatusError>("not json").is_err());
        assert!(serde_json::from_str::<StatusError>(r#"{"error":"boom"}"#).is_err());
        assert!(
            serde_json::from_str::<StatusError>(r#"{"code":"NO_SUCH_CODE","message":"x"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err = StatusError::new(ErrorCode::RequestTimeout, "dial tcp");
        assert_eq!(err.to_string(), "[REQUEST_TIMEOUT] dial tcp");
    }
}
