//! # carrier-server
//!
//! HTTP server for carrier.
//!
//! This crate provides:
//! - Capability-polymorphic route operators (path, method, handler)
//! - A route compiler turning declared chains into a dispatch table
//! - Exact-segment and `:param` path matching
//! - hyper-based serving with CORS decoration and a liveness endpoint
//! - Two-phase cooperative shutdown (begin-drain / drain-complete)

pub mod config;
pub mod error;
pub mod operator;
pub mod route;
pub mod router;
pub mod serve;

pub use config::{ConfigError, ServeConfig};
pub use error::ServerError;
pub use operator::{Group, Handler, Operator, Reply, RequestContext};
pub use route::{clean_path, display_path, Route, RouteTable};
pub use router::{compile, Dispatcher};
pub use serve::{HttpServer, ShutdownHandle};
