//! # carrier-client
//!
//! Client library for carrier.
//!
//! This crate provides:
//! - Request builder resolving identity and version switches per call
//! - HTTP and RPC transport strategy variants behind one `Request` shape
//! - Offline mock substitution keyed by (service, request id)
//! - Transport decorator hook for instrumentation and retry wrappers

pub mod client;
pub mod mock;
pub mod request;
pub mod transport_http;
pub mod transport_rpc;

pub use client::{Client, ClientConfig, ExecutionMode};
pub use mock::{MockRegistry, MockRequest};
pub use request::Request;
pub use transport_http::{
    long_conn_transport, short_conn_transport, HttpRequest, HttpTransport, TransportWrapper,
};
pub use transport_rpc::{parse_id, RpcCall, RpcRequest, RpcTransport};
