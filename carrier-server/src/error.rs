//! Server error types.

use thiserror::Error;

/// Server errors.
///
/// Route compilation variants are structural misconfiguration: they surface
/// at startup from [`compile`](crate::compile) and are never produced per
/// request.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("route table is empty; register at least one route before serving")]
    EmptyRouteTable,

    #[error("route {path}: no operator declares an http method (terminal operator {operator})")]
    MissingMethod { path: String, operator: String },

    #[error("route {path}: no handler-capable operator in chain")]
    NoHandler { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
