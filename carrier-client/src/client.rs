//! Request builder.

use crate::mock::{MockRegistry, MockRequest};
use crate::request::Request;
use crate::transport_http::{HttpRequest, TransportWrapper};
use crate::transport_rpc::{parse_id, RpcRequest, RpcTransport};
use carrier_protocol::{
    resolve_request_id, IdentityPolicy, Metadata, HEADER_REQUEST_ID, HEADER_USER_AGENT,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Process-wide execution mode.
///
/// Offline execution enables mock substitution and, unless an explicit
/// [`IdentityPolicy`] says otherwise, the inbound request-id override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Online,
    Offline,
}

impl ExecutionMode {
    pub fn is_online(&self) -> bool {
        matches!(self, ExecutionMode::Online)
    }
}

/// Upstream client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Upstream name, for diagnostics.
    pub name: String,
    /// Calling service name, stamped into the user-agent header.
    pub service: String,
    /// Calling service version, stamped into the user-agent header.
    pub version: String,
    /// Upstream host.
    pub host: String,
    /// Upstream port; 0 and 80 are both rendered without a port suffix.
    pub port: u16,
    /// Transport mode: `"rpc"` selects the RPC variant; anything else is
    /// the HTTP variant with the mode string used as the URL protocol.
    pub mode: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            service: String::new(),
            version: String::new(),
            host: "localhost".to_string(),
            port: 80,
            mode: "http".to_string(),
            timeout_secs: 5,
        }
    }
}

impl ClientConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Fills unset fields from the environment and defaults.
    pub fn apply_defaults(&mut self) {
        if self.service.is_empty() {
            self.service = std::env::var("CARRIER_SERVICE").unwrap_or_default();
        }
        if self.version.is_empty() {
            self.version = std::env::var("CARRIER_VERSION").unwrap_or_default();
        }
        if self.host.is_empty() {
            self.host = "localhost".to_string();
        }
        if self.mode.is_empty() {
            self.mode = "http".to_string();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = 5;
        }
    }

    /// Per-call timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Client building transport-specific requests from logical call ids.
///
/// Holds only immutable configuration and collaborators; `build_request`
/// performs no I/O and is safe to call concurrently from multiple callers
/// sharing one instance.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    execution: ExecutionMode,
    identity: Option<IdentityPolicy>,
    inbound_request_id: Option<String>,
    mocks: Option<Arc<MockRegistry>>,
    rpc_transport: Option<Arc<dyn RpcTransport>>,
    wrap_transport: Option<TransportWrapper>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("execution", &self.execution)
            .field("identity", &self.identity)
            .field("inbound_request_id", &self.inbound_request_id)
            .field("mocks_enabled", &self.mocks.is_some())
            .field("rpc_transport", &self.rpc_transport.is_some())
            .field("wrap_transport", &self.wrap_transport.is_some())
            .finish()
    }
}

impl Client {
    /// Creates a new client.
    pub fn new(mut config: ClientConfig) -> Self {
        config.apply_defaults();
        Self {
            config,
            execution: ExecutionMode::default(),
            identity: None,
            inbound_request_id: None,
            mocks: None,
            rpc_transport: None,
            wrap_transport: None,
        }
    }

    /// Sets the execution mode.
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution = mode;
        self
    }

    /// Overrides the identity policy derived from the execution mode.
    pub fn with_identity_policy(mut self, policy: IdentityPolicy) -> Self {
        self.identity = Some(policy);
        self
    }

    /// Sets the inbound request id to propagate, typically taken from the
    /// serving request this call is made on behalf of.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.inbound_request_id = Some(request_id.into());
        self
    }

    /// Attaches a mock registry, consulted only in offline execution.
    pub fn with_mocks(mut self, mocks: Arc<MockRegistry>) -> Self {
        self.mocks = Some(mocks);
        self
    }

    /// Attaches the external RPC wire transport.
    pub fn with_rpc_transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.rpc_transport = Some(transport);
        self
    }

    /// Attaches a transport decorator applied to every HTTP call.
    pub fn with_wrap_transport(mut self, wrap: TransportWrapper) -> Self {
        self.wrap_transport = Some(wrap);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Assembles the base URL for a protocol.
    ///
    /// The scheme is prepended only for a non-empty protocol; the port
    /// suffix is appended only when a port is set and differs from 80
    /// (port 0 means no explicit port).
    pub fn base_url(&self, protocol: &str) -> String {
        let mut url = self.config.host.clone();
        if !protocol.is_empty() {
            url = format!("{}://{}", protocol, self.config.host);
        }
        if self.config.port > 0 && self.config.port != 80 {
            url = format!("{}:{}", url, self.config.port);
        }
        url
    }

    /// Builds one request: merges metadata sources, resolves the request
    /// identity, consults the mock registry in offline execution, then
    /// constructs the transport variant selected by the configured mode.
    ///
    /// No I/O happens until the returned request is executed.
    pub fn build_request(
        &self,
        id: &str,
        http_method: &str,
        uri: &str,
        payload: Option<Value>,
        metas: &[Metadata],
    ) -> Request {
        let mut metadata = Metadata::merge(metas);

        let policy = self
            .identity
            .unwrap_or_else(|| IdentityPolicy::new(!self.execution.is_online()));
        let initial = self.inbound_request_id.as_deref().unwrap_or("");
        let request_id = resolve_request_id(initial, &mut metadata, &policy);

        if !self.execution.is_online() {
            if let Some(mocks) = &self.mocks {
                if let Some(data) = mocks.lookup(&self.config.service, &request_id, id) {
                    return Request::Mock(MockRequest {
                        id: id.to_string(),
                        request_id,
                        metadata,
                        data,
                    });
                }
            }
        }

        metadata.add(HEADER_REQUEST_ID, &request_id);
        metadata.add(
            HEADER_USER_AGENT,
            format!("{} {}", self.config.service, self.config.version),
        );

        match self.config.mode.to_lowercase().as_str() {
            "rpc" => {
                let (server_name, method) = parse_id(id);
                Request::Rpc(RpcRequest {
                    id: id.to_string(),
                    base_url: self.base_url(""),
                    server_name,
                    method,
                    request_id,
                    metadata,
                    timeout: self.config.timeout(),
                    payload,
                    transport: self.rpc_transport.clone(),
                })
            }
            protocol => Request::Http(HttpRequest {
                base_url: self.base_url(protocol),
                method: http_method.to_string(),
                uri: uri.to_string(),
                id: id.to_string(),
                metadata,
                timeout: self.config.timeout(),
                payload,
                transport: None,
                wrap_transport: self.wrap_transport.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrier_protocol::VERSION_SWITCH_KEY;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn client(host: &str, port: u16, mode: &str) -> Client {
        Client::new(ClientConfig {
            service: "orders".to_string(),
            version: "1.2.0".to_string(),
            host: host.to_string(),
            port,
            mode: mode.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_base_url_assembly() {
        assert_eq!(
            client("api.example.com", 0, "").base_url(""),
            "api.example.com"
        );
        assert_eq!(
            client("api.example.com", 80, "").base_url(""),
            "api.example.com"
        );
        assert_eq!(
            client("api.example.com", 8080, "").base_url(""),
            "api.example.com:8080"
        );
        assert_eq!(
            client("api.example.com", 443, "").base_url("https"),
            "https://api.example.com:443"
        );
    }

    #[test]
    fn test_mode_selects_variant() {
        let req = client("h", 80, "rpc").build_request("UserClient.Get", "", "", None, &[]);
        assert!(matches!(req, Request::Rpc(_)));

        let req = client("h", 80, "RPC").build_request("UserClient.Get", "", "", None, &[]);
        assert!(matches!(req, Request::Rpc(_)));

        // Unrecognized modes fall back to the HTTP variant.
        let req = client("h", 80, "").build_request("UserClient.Get", "GET", "/u", None, &[]);
        assert!(matches!(req, Request::Http(_)));
        let req = client("h", 80, "https").build_request("UserClient.Get", "GET", "/u", None, &[]);
        match req {
            Request::Http(http) => assert_eq!(http.base_url, "https://h"),
            _ => panic!("expected http variant"),
        }
    }

    #[test]
    fn test_request_carries_identity_headers() {
        let req = client("h", 80, "http").build_request("UserClient.Get", "GET", "/u", None, &[]);
        let meta = req.metadata();
        assert!(!meta.get(HEADER_REQUEST_ID).unwrap().is_empty());
        assert_eq!(meta.get(HEADER_USER_AGENT), Some("orders 1.2.0"));
    }

    #[test]
    fn test_explicit_metadata_version_switch_wins() {
        let mut inbound = Metadata::new();
        inbound.set(VERSION_SWITCH_KEY, "v2");

        let c = client("h", 80, "http").with_request_id("req-1|v1");
        let req = c.build_request("UserClient.Get", "GET", "/u", None, &[inbound]);

        let meta = req.metadata();
        assert_eq!(meta.get(VERSION_SWITCH_KEY), Some("v2"));
        assert_eq!(meta.get(HEADER_REQUEST_ID), Some("req-1|v2"));
    }

    #[test]
    fn test_embedded_version_switch_propagates_to_metadata() {
        let c = client("h", 80, "http").with_request_id("req-1|v1");
        let req = c.build_request("UserClient.Get", "GET", "/u", None, &[]);

        let meta = req.metadata();
        assert_eq!(meta.get(VERSION_SWITCH_KEY), Some("v1"));
        assert_eq!(meta.get(HEADER_REQUEST_ID), Some("req-1|v1"));
    }

    #[test]
    fn test_offline_mock_substitution() {
        let mocks = Arc::new(MockRegistry::new());
        mocks.register("orders", "fixture-1", "UserClient.Get", json!({"id": 9}));

        let c = client("h", 80, "http")
            .with_execution_mode(ExecutionMode::Offline)
            .with_mocks(mocks);

        let mut inbound = Metadata::new();
        inbound.set(HEADER_REQUEST_ID, "fixture-1");
        let req = c.build_request("UserClient.Get", "GET", "/u", None, &[inbound]);
        assert!(req.is_mock());

        // No fixture for this call id: falls through to the real variant.
        let mut inbound = Metadata::new();
        inbound.set(HEADER_REQUEST_ID, "fixture-1");
        let req = c.build_request("UserClient.List", "GET", "/u", None, &[inbound]);
        assert!(!req.is_mock());
    }

    #[test]
    fn test_online_mode_never_consults_mocks() {
        let mocks = Arc::new(MockRegistry::new());
        mocks.register("orders", "fixture-1", "UserClient.Get", json!(1));

        let c = client("h", 80, "http").with_mocks(mocks);
        let mut inbound = Metadata::new();
        inbound.set(HEADER_REQUEST_ID, "fixture-1");
        let req = c.build_request("UserClient.Get", "GET", "/u", None, &[inbound]);
        assert!(!req.is_mock());
    }

    #[test]
    fn test_request_ids_unique_across_concurrent_builds() {
        let c = Arc::new(client("h", 80, "http"));
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let c = c.clone();
            let seen = seen.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1250 {
                    let req = c.build_request("UserClient.Get", "GET", "/u", None, &[]);
                    let id = req.metadata().get(HEADER_REQUEST_ID).unwrap().to_string();
                    assert!(!id.is_empty());
                    assert!(seen.lock().unwrap().insert(id), "request id collision");
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(seen.lock().unwrap().len(), 10_000);
    }
}
