//! # carrier-protocol
//!
//! Metadata protocol for carrier.
//!
//! This crate provides:
//! - Case-insensitive multi-value metadata container with additive merge
//! - Request identity resolution and version-switch propagation
//! - Stable error codes and the structured wire error type
//! - Call result envelope with content-type selected decoding

pub mod identity;
pub mod metadata;
pub mod result;
pub mod status;

pub use identity::{
    embed_version_switch, new_request_id, parse_version_switch, resolve_request_id, IdentityPolicy,
};
pub use metadata::Metadata;
pub use result::{BodyCodec, CallResult};
pub use status::{ErrorCode, StatusError};

/// Metadata key carrying the propagated request identity.
pub const HEADER_REQUEST_ID: &str = "X-Request-Id";

/// Metadata key identifying the calling service (`"<service> <version>"`).
pub const HEADER_USER_AGENT: &str = "User-Agent";

/// Metadata key pinning a call chain to a backend variant.
pub const VERSION_SWITCH_KEY: &str = "X-Version-Switch";

/// Metadata key carrying the payload content type.
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

/// Content type that selects the JSON body codec.
pub const MIME_JSON: &str = "application/json";

/// Returns whether an HTTP status code is in the success range [200, 300).
pub fn http_status_ok(code: u16) -> bool {
    (200..300).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_ok_range() {
        assert!(http_status_ok(200));
        assert!(http_status_ok(204));
        assert!(http_status_ok(299));
        assert!(!http_status_ok(300));
        assert!(!http_status_ok(199));
        assert!(!http_status_ok(404));
        assert!(!http_status_ok(500));
    }
}
