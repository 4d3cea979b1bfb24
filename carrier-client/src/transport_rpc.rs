//! RPC transport variant.
//!
//! Wire encoding and framing are delegated entirely to an external
//! [`RpcTransport`] collaborator; this module owns call-id parsing and the
//! same metadata/timeout/payload contract as the HTTP variant.

use async_trait::async_trait;
use carrier_protocol::{CallResult, ErrorCode, Metadata, StatusError};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Splits a call id of the form `"<ServiceIdentifier>.<MethodName>"`.
///
/// The service segment has any literal `"Client"` stripped and is lowercased
/// to form the backend service name. An id that does not split into exactly
/// two segments yields both parts empty; that is a caller contract
/// violation, surfaced when execution rejects the empty method.
pub fn parse_id(id: &str) -> (String, String) {
    let parts: Vec<&str> = id.split('.').collect();
    if parts.len() != 2 {
        return (String::new(), String::new());
    }
    (
        parts[0].replace("Client", "").to_lowercase(),
        parts[1].to_string(),
    )
}

/// One call handed to the external wire transport.
#[derive(Debug, Clone)]
pub struct RpcCall {
    pub base_url: String,
    pub server_name: String,
    pub method: String,
    pub request_id: String,
    pub metadata: Metadata,
    pub timeout: Duration,
    pub payload: Option<Value>,
}

/// External RPC wire collaborator.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, call: RpcCall) -> CallResult;
}

/// One RPC call, constructed by the request builder and executed once.
pub struct RpcRequest {
    /// Logical call id, for log correlation.
    pub id: String,
    pub base_url: String,
    pub server_name: String,
    pub method: String,
    pub request_id: String,
    pub metadata: Metadata,
    pub timeout: Duration,
    pub payload: Option<Value>,
    pub transport: Option<Arc<dyn RpcTransport>>,
}

impl RpcRequest {
    /// Executes the call, with the same one-timing-record contract as the
    /// HTTP variant.
    pub async fn execute(self) -> CallResult {
        let started = Instant::now();

        let result = self.perform().await;

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result.err {
            None => tracing::info!(
                duration_ms,
                request = %self.id,
                server = %self.server_name,
                method = %self.method,
                metadata = ?self.metadata,
                "rpc call complete"
            ),
            Some(err) => tracing::warn!(
                duration_ms,
                request = %self.id,
                server = %self.server_name,
                method = %self.method,
                metadata = ?self.metadata,
                error = %err,
                "rpc call failed"
            ),
        }

        result
    }

    async fn perform(&self) -> CallResult {
        if self.method.is_empty() {
            return CallResult::fail(StatusError::new(
                ErrorCode::InvalidRequestParams,
                "empty rpc method",
            ));
        }
        let transport = match &self.transport {
            Some(transport) => transport,
            None => {
                return CallResult::fail(StatusError::new(
                    ErrorCode::InvalidRequestParams,
                    "no rpc transport configured",
                ))
            }
        };

        transport
            .call(RpcCall {
                base_url: self.base_url.clone(),
                server_name: self.server_name.clone(),
                method: self.method.clone(),
                request_id: self.request_id.clone(),
                metadata: self.metadata.clone(),
                timeout: self.timeout,
                payload: self.payload.clone(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use carrier_protocol::BodyCodec;

    #[test]
    fn test_parse_id() {
        assert_eq!(
            parse_id("UserClient.Get"),
            ("user".to_string(), "Get".to_string())
        );
        assert_eq!(
            parse_id("Billing.Charge"),
            ("billing".to_string(), "Charge".to_string())
        );
        assert_eq!(parse_id("nouserclient"), (String::new(), String::new()));
        assert_eq!(parse_id("a.b.c"), (String::new(), String::new()));
        assert_eq!(parse_id(""), (String::new(), String::new()));
    }

    struct EchoTransport;

    #[async_trait]
    impl RpcTransport for EchoTransport {
        async fn call(&self, call: RpcCall) -> CallResult {
            let body = serde_json::to_vec(&call.payload).unwrap();
            CallResult::ok(Bytes::from(body), Metadata::new(), Some(BodyCodec::Json))
        }
    }

    fn rpc_request(method: &str) -> RpcRequest {
        RpcRequest {
            id: "UserClient.Get".to_string(),
            base_url: "localhost:9000".to_string(),
            server_name: "user".to_string(),
            method: method.to_string(),
            request_id: "req-1".to_string(),
            metadata: Metadata::new(),
            timeout: Duration::from_secs(1),
            payload: Some(serde_json::json!({"k": 1})),
            transport: Some(Arc::new(EchoTransport)),
        }
    }

    #[tokio::test]
    async fn test_empty_method_rejected_deterministically() {
        let result = rpc_request("").execute().await;
        assert_eq!(result.err.unwrap().code, ErrorCode::InvalidRequestParams);
    }

    #[tokio::test]
    async fn test_missing_transport_rejected() {
        let mut req = rpc_request("Get");
        req.transport = None;
        let result = req.execute().await;
        assert_eq!(result.err.unwrap().code, ErrorCode::InvalidRequestParams);
    }

    #[tokio::test]
    async fn test_delegates_to_transport() {
        let result = rpc_request("Get").execute().await;
        assert!(result.is_ok());
        let value: Value = result.decode().unwrap();
        assert_eq!(value, serde_json::json!({"k": 1}));
    }
}
