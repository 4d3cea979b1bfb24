//! Route operators and their capability set.
//!
//! An operator is one composable step in a route chain. Capabilities are
//! explicit trait methods rather than runtime type inspection: an operator
//! may contribute a path segment, declare the route's HTTP method, and/or
//! act as a request handler.

use async_trait::async_trait;
use bytes::Bytes;
use carrier_protocol::{ErrorCode, Metadata, StatusError, MIME_JSON};
use hyper::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// One step in a route's operator chain.
pub trait Operator: Send + Sync + 'static {
    /// Name shown in route registration lines.
    fn name(&self) -> &str;

    /// Path segment this operator contributes, if any.
    fn path_segment(&self) -> Option<&str> {
        None
    }

    /// HTTP method this operator declares, if any. By convention the
    /// terminal operator declares it.
    fn method(&self) -> Option<Method> {
        None
    }

    /// Handler capability, if this operator handles requests.
    fn as_handler(&self) -> Option<&dyn Handler> {
        None
    }
}

/// Request handling capability.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, cx: &RequestContext) -> Result<Reply, StatusError>;
}

/// Per-request context handed to handlers.
///
/// Built fresh for each inbound request; handlers run under arbitrary
/// concurrency and only read it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    /// Captures from `:param` path segments.
    pub params: HashMap<String, String>,
    pub metadata: Metadata,
    pub body: Bytes,
}

impl RequestContext {
    /// Returns a `:param` capture by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Decodes the request body as JSON.
    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, StatusError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            StatusError::new(ErrorCode::BadRequest, "request body decode failed")
                .with_desc(e.to_string())
        })
    }
}

/// Response produced by a handler.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Reply {
    /// Empty 200 response.
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// JSON 200 response.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, StatusError> {
        let body = serde_json::to_vec(value).map_err(|e| {
            StatusError::new(ErrorCode::InternalError, "response encoding failed")
                .with_desc(e.to_string())
        })?;
        Ok(Self {
            status: StatusCode::OK,
            content_type: Some(MIME_JSON.to_string()),
            body: Bytes::from(body),
        })
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Renders a structured error as its declared HTTP status with a JSON
    /// body carrying the error verbatim.
    pub fn from_status_error(err: &StatusError) -> Self {
        let status = StatusCode::from_u16(err.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_vec(err).unwrap_or_default();
        Self {
            status,
            content_type: Some(MIME_JSON.to_string()),
            body: Bytes::from(body),
        }
    }
}

/// Path-contribution-only operator used to prefix a chain.
pub struct Group {
    name: String,
    segment: String,
}

impl Group {
    pub fn new(segment: impl Into<String>) -> Self {
        let segment = segment.into();
        Self {
            name: format!("Group<{}>", segment.trim_matches('/')),
            segment,
        }
    }
}

impl Operator for Group {
    fn name(&self) -> &str {
        &self.name
    }

    fn path_segment(&self) -> Option<&str> {
        Some(&self.segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_contributes_path_only() {
        let group = Group::new("/v0");
        assert_eq!(group.path_segment(), Some("/v0"));
        assert_eq!(group.method(), None);
        assert!(group.as_handler().is_none());
        assert_eq!(group.name(), "Group<v0>");
    }

    #[test]
    fn test_reply_from_status_error() {
        let err = StatusError::new(ErrorCode::NotFound, "no such route");
        let reply = Reply::from_status_error(&err);
        assert_eq!(reply.status, StatusCode::NOT_FOUND);

        let parsed: StatusError = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_decode_body() {
        let cx = RequestContext {
            method: Method::POST,
            path: "/v0/echo".to_string(),
            params: HashMap::new(),
            metadata: Metadata::new(),
            body: Bytes::from_static(br#"{"n": 3}"#),
        };
        let value: serde_json::Value = cx.decode_body().unwrap();
        assert_eq!(value["n"], 3);

        let bad = RequestContext {
            body: Bytes::from_static(b"nope"),
            ..cx
        };
        let err = bad.decode_body::<serde_json::Value>().unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
    }
}
