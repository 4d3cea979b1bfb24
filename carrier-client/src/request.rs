//! The uniform request shape over all transport variants.

use crate::mock::MockRequest;
use crate::transport_http::HttpRequest;
use crate::transport_rpc::RpcRequest;
use carrier_protocol::{CallResult, Metadata};

/// A call built by the [`Client`](crate::Client), executed exactly once.
///
/// Construction performs no I/O; the variant decides what `execute` does.
pub enum Request {
    Http(HttpRequest),
    Rpc(RpcRequest),
    Mock(MockRequest),
}

impl Request {
    /// Executes the call and consumes the request; requests are never
    /// reused or pooled.
    pub async fn execute(self) -> CallResult {
        match self {
            Request::Http(request) => request.execute().await,
            Request::Rpc(request) => request.execute().await,
            Request::Mock(request) => request.execute().await,
        }
    }

    /// Logical call id this request was built from.
    pub fn id(&self) -> &str {
        match self {
            Request::Http(request) => &request.id,
            Request::Rpc(request) => &request.id,
            Request::Mock(request) => &request.id,
        }
    }

    /// Outbound metadata carried by this request.
    pub fn metadata(&self) -> &Metadata {
        match self {
            Request::Http(request) => &request.metadata,
            Request::Rpc(request) => &request.metadata,
            Request::Mock(request) => &request.metadata,
        }
    }

    /// Returns whether this request was substituted by a mock fixture.
    pub fn is_mock(&self) -> bool {
        matches!(self, Request::Mock(_))
    }
}
