//! Offline mock substitution.
//!
//! A registry of canned responses keyed by (service, request id, call id).
//! Fixtures are loaded by an external mechanism before calls are built; at
//! call time the registry is read-only. A successful lookup replaces the
//! real transport entirely.

use bytes::Bytes;
use carrier_protocol::{parse_version_switch, BodyCodec, CallResult, ErrorCode, Metadata, StatusError};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;

/// Canned-response table for non-production execution.
#[derive(Debug, Default)]
pub struct MockRegistry {
    records: DashMap<(String, String), HashMap<String, Value>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fixture payload for (service, request id, call id).
    ///
    /// Called by the fixture-loading mechanism, not by request execution.
    pub fn register(
        &self,
        service: impl Into<String>,
        request_id: impl Into<String>,
        call_id: impl Into<String>,
        payload: Value,
    ) {
        self.records
            .entry((service.into(), request_id.into()))
            .or_default()
            .insert(call_id.into(), payload);
    }

    /// Looks up a fixture for a resolved request id.
    ///
    /// A version-switch suffix on the request id is stripped to recover the
    /// fixture key; a request id that yields no fixture simply returns
    /// `None` so the call falls through to the real transport.
    pub fn lookup(&self, service: &str, request_id: &str, call_id: &str) -> Option<Value> {
        let fixture_id = match parse_version_switch(request_id) {
            Some((base, _)) => base,
            None => request_id,
        };
        self.records
            .get(&(service.to_string(), fixture_id.to_string()))?
            .get(call_id)
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A call short-circuited by a registry hit; never touches the network.
pub struct MockRequest {
    /// Logical call id the fixture was registered under.
    pub id: String,
    pub request_id: String,
    pub metadata: Metadata,
    pub data: Value,
}

impl MockRequest {
    /// Synthesizes a result purely from the canned payload.
    pub async fn execute(self) -> CallResult {
        tracing::warn!(
            request = %self.request_id,
            call = %self.id,
            "substituting call with mock fixture"
        );

        match serde_json::to_vec(&self.data) {
            Ok(body) => CallResult::ok(Bytes::from(body), Metadata::new(), Some(BodyCodec::Json)),
            Err(e) => CallResult::fail(
                StatusError::new(ErrorCode::InvalidRequestParams, "mock fixture encoding failed")
                    .with_desc(e.to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_hit_and_miss() {
        let registry = MockRegistry::new();
        registry.register("billing", "req-1", "UserClient.Get", json!({"id": 7}));

        assert_eq!(
            registry.lookup("billing", "req-1", "UserClient.Get"),
            Some(json!({"id": 7}))
        );
        assert_eq!(registry.lookup("billing", "req-2", "UserClient.Get"), None);
        assert_eq!(registry.lookup("other", "req-1", "UserClient.Get"), None);
        assert_eq!(registry.lookup("billing", "req-1", "UserClient.List"), None);
    }

    #[test]
    fn test_lookup_strips_version_switch_suffix() {
        let registry = MockRegistry::new();
        registry.register("billing", "req-1", "UserClient.Get", json!(1));

        assert_eq!(
            registry.lookup("billing", "req-1|v2", "UserClient.Get"),
            Some(json!(1))
        );
    }

    #[tokio::test]
    async fn test_execute_returns_exact_fixture_payload() {
        let request = MockRequest {
            id: "UserClient.Get".to_string(),
            request_id: "req-1".to_string(),
            metadata: Metadata::new(),
            data: json!({"name": "ada", "id": 42}),
        };

        let result = request.execute().await;
        assert!(result.is_ok());
        let value: Value = result.decode().unwrap();
        assert_eq!(value, json!({"name": "ada", "id": 42}));
    }
}
