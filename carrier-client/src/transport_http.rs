//! HTTP transport variant.

use async_trait::async_trait;
use bytes::Bytes;
use carrier_protocol::{
    http_status_ok, BodyCodec, CallResult, ErrorCode, Metadata, StatusError, HEADER_CONTENT_TYPE,
    MIME_JSON,
};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::Method;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Underlying HTTP execution seam.
///
/// The default implementations dial a connection per round trip; decorators
/// (retry, circuit breaking, instrumentation) wrap this trait without the
/// call site changing.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn round_trip(
        &self,
        request: hyper::Request<Full<Bytes>>,
    ) -> Result<hyper::Response<Incoming>, StatusError>;
}

/// Decorator hook wrapping the underlying transport.
pub type TransportWrapper =
    Arc<dyn Fn(Arc<dyn HttpTransport>) -> Arc<dyn HttpTransport> + Send + Sync>;

/// Transport dialing a fresh, non-reusable connection per call.
///
/// Bounds resource usage for bursty low-volume traffic; the default for
/// request execution.
struct ShortConnTransport {
    timeout: Duration,
}

/// Transport keeping connections alive across calls.
///
/// A reusable utility for sustained traffic; selected explicitly by the
/// caller of the transport layer.
struct LongConnTransport {
    client: HyperClient<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

/// Returns a transport that dials a fresh connection per call.
pub fn short_conn_transport(timeout: Duration) -> Arc<dyn HttpTransport> {
    Arc::new(ShortConnTransport { timeout })
}

/// Returns a keep-alive transport reusing pooled connections.
pub fn long_conn_transport(timeout: Duration) -> Arc<dyn HttpTransport> {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(timeout));
    let client = HyperClient::builder(TokioExecutor::new()).build(connector);
    Arc::new(LongConnTransport { client, timeout })
}

async fn execute_with_timeout(
    client: &HyperClient<HttpConnector, Full<Bytes>>,
    request: hyper::Request<Full<Bytes>>,
    timeout: Duration,
) -> Result<hyper::Response<Incoming>, StatusError> {
    match tokio::time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(
            StatusError::new(ErrorCode::RequestTimeout, "http request failed")
                .with_desc(e.to_string()),
        ),
        Err(_) => Err(StatusError::new(
            ErrorCode::RequestTimeout,
            "http request timed out",
        )),
    }
}

#[async_trait]
impl HttpTransport for ShortConnTransport {
    async fn round_trip(
        &self,
        request: hyper::Request<Full<Bytes>>,
    ) -> Result<hyper::Response<Incoming>, StatusError> {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(self.timeout));
        let client = HyperClient::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);
        execute_with_timeout(&client, request, self.timeout).await
    }
}

#[async_trait]
impl HttpTransport for LongConnTransport {
    async fn round_trip(
        &self,
        request: hyper::Request<Full<Bytes>>,
    ) -> Result<hyper::Response<Incoming>, StatusError> {
        execute_with_timeout(&self.client, request, self.timeout).await
    }
}

/// One HTTP call, constructed by the request builder and executed once.
pub struct HttpRequest {
    pub base_url: String,
    pub method: String,
    pub uri: String,
    /// Logical call id, for log correlation.
    pub id: String,
    pub metadata: Metadata,
    pub timeout: Duration,
    pub payload: Option<Value>,
    /// Overrides the default short-connection transport, e.g. with
    /// [`long_conn_transport`] for sustained traffic.
    pub transport: Option<Arc<dyn HttpTransport>>,
    /// Decorator applied to whichever transport executes the call.
    pub wrap_transport: Option<TransportWrapper>,
}

impl HttpRequest {
    /// Executes the call.
    ///
    /// Emits exactly one structured timing record on every exit path:
    /// info on success, warn with the error detail on failure.
    pub async fn execute(self) -> CallResult {
        let started = Instant::now();
        let url = format!("{}{}", self.base_url, self.uri);

        let result = self.perform(&url).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result.err {
            None => tracing::info!(
                duration_ms,
                request = %self.id,
                method = %self.method,
                url = %url,
                metadata = ?self.metadata,
                "http call complete"
            ),
            Some(err) => tracing::warn!(
                duration_ms,
                request = %self.id,
                method = %self.method,
                url = %url,
                metadata = ?self.metadata,
                error = %err,
                "http call failed"
            ),
        }

        result
    }

    async fn perform(&self, url: &str) -> CallResult {
        let request = match self.build_http_request(url) {
            Ok(request) => request,
            Err(err) => return CallResult::fail(err),
        };

        let mut transport = match &self.transport {
            Some(custom) => custom.clone(),
            None => short_conn_transport(self.timeout),
        };
        if let Some(wrap) = &self.wrap_transport {
            transport = wrap(transport);
        }

        let response = match transport.round_trip(request).await {
            Ok(response) => response,
            Err(err) => return CallResult::fail(err),
        };

        let status = response.status();
        let mut meta = Metadata::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                meta.add(name.as_str(), value);
            }
        }

        let data = match response.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return CallResult::fail(
                    StatusError::new(ErrorCode::RequestTimeout, "reading response body failed")
                        .with_desc(e.to_string()),
                )
            }
        };

        let codec = meta
            .get(HEADER_CONTENT_TYPE)
            .and_then(BodyCodec::for_content_type);
        let mut result = CallResult::ok(data, meta, codec);

        if !http_status_ok(status.as_u16()) {
            result.err = match serde_json::from_slice::<StatusError>(&result.data) {
                // Structured service error: propagate verbatim.
                Ok(remote) => Some(remote),
                Err(_) => Some(StatusError::new(
                    ErrorCode::HttpRequestFailed,
                    format!("[{}] {} {}", status.as_u16(), self.method, url),
                )),
            };
        }

        result
    }

    fn build_http_request(&self, url: &str) -> Result<hyper::Request<Full<Bytes>>, StatusError> {
        let method = Method::from_bytes(self.method.as_bytes()).map_err(|e| {
            StatusError::new(ErrorCode::InvalidRequestParams, "invalid http method")
                .with_desc(e.to_string())
        })?;

        let mut builder = hyper::Request::builder().method(method).uri(url);
        for (key, values) in self.metadata.iter() {
            for value in values {
                builder = builder.header(key, value);
            }
        }

        let body = match &self.payload {
            Some(value) => {
                builder = builder.header(HEADER_CONTENT_TYPE, MIME_JSON);
                Bytes::from(serde_json::to_vec(value).map_err(|e| {
                    StatusError::new(ErrorCode::InvalidRequestParams, "payload encoding failed")
                        .with_desc(e.to_string())
                })?)
            }
            None => Bytes::new(),
        };

        builder.body(Full::new(body)).map_err(|e| {
            StatusError::new(ErrorCode::InvalidRequestParams, "invalid request")
                .with_desc(e.to_string())
        })
    }
}
