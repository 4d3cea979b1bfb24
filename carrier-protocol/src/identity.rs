//! Request identity resolution and version-switch propagation.
//!
//! A version switch is a tag pinning a call chain to a backend variant
//! (canary / traffic split). Once established anywhere in a chain it must
//! survive to every downstream call: it travels either embedded in the
//! request id (`"<base>|<tag>"` suffix convention) or as the explicit
//! `X-Version-Switch` metadata entry.

use crate::metadata::Metadata;
use crate::{HEADER_REQUEST_ID, VERSION_SWITCH_KEY};
use uuid::Uuid;

/// Policy for honoring an inbound `X-Request-Id` metadata override.
///
/// Overriding lets mock-driven tests force the request id to match a fixture
/// key. Callers typically enable it only outside production execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityPolicy {
    /// Whether a request id carried in inbound metadata replaces the
    /// caller-supplied one.
    pub allow_header_override: bool,
}

impl IdentityPolicy {
    pub fn new(allow_header_override: bool) -> Self {
        Self {
            allow_header_override,
        }
    }
}

/// Mints a fresh globally-unique request id.
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Splits a request id into its base and version-switch tag.
///
/// Returns `None` when the id carries no tag or the tag is malformed (empty
/// base or empty tag). Malformed tags are treated as absent, never as an
/// error.
pub fn parse_version_switch(id: &str) -> Option<(&str, &str)> {
    let (base, tag) = id.rsplit_once('|')?;
    if base.is_empty() || tag.is_empty() {
        return None;
    }
    Some((base, tag))
}

/// Rewrites a request id to embed a version-switch tag.
///
/// Any previously embedded tag is replaced. An empty id gets a freshly
/// minted base first so the result is always well-formed.
pub fn embed_version_switch(id: &str, tag: &str) -> String {
    let base = match parse_version_switch(id) {
        Some((base, _)) => base.to_string(),
        None if id.is_empty() => new_request_id(),
        None => id.to_string(),
    };
    format!("{}|{}", base, tag)
}

/// Resolves the request identity for an outbound call.
///
/// Deterministic apart from id minting:
/// 1. starts from the caller-supplied id;
/// 2. the policy may let an inbound `X-Request-Id` metadata entry override it;
/// 3. an explicit `X-Version-Switch` metadata entry is rewritten into the id
///    (explicit metadata wins); otherwise a tag already embedded in the id is
///    copied out to metadata so the next hop sees it;
/// 4. an id that is still empty is minted fresh.
pub fn resolve_request_id(
    initial: &str,
    metadata: &mut Metadata,
    policy: &IdentityPolicy,
) -> String {
    let mut request_id = initial.to_string();

    if policy.allow_header_override {
        if let Some(inbound) = metadata.get(HEADER_REQUEST_ID) {
            if !inbound.is_empty() {
                request_id = inbound.to_string();
            }
        }
    }

    let explicit_tag = metadata.get(VERSION_SWITCH_KEY).map(str::to_string);
    match explicit_tag {
        Some(tag) if !tag.is_empty() => {
            request_id = embed_version_switch(&request_id, &tag);
        }
        _ => {
            if let Some((_, tag)) = parse_version_switch(&request_id) {
                let tag = tag.to_string();
                metadata.set(VERSION_SWITCH_KEY, tag);
            }
        }
    }

    if request_id.is_empty() {
        request_id = new_request_id();
    }

    request_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_parse_version_switch() {
        assert_eq!(parse_version_switch("req-1|v2"), Some(("req-1", "v2")));
        assert_eq!(parse_version_switch("req-1"), None);
        assert_eq!(parse_version_switch("|v2"), None);
        assert_eq!(parse_version_switch("req-1|"), None);
        assert_eq!(parse_version_switch(""), None);
    }

    #[test]
    fn test_embed_replaces_existing_tag() {
        assert_eq!(embed_version_switch("req-1", "v2"), "req-1|v2");
        assert_eq!(embed_version_switch("req-1|v1", "v2"), "req-1|v2");
    }

    #[test]
    fn test_embed_into_empty_id_mints_base() {
        let id = embed_version_switch("", "v2");
        let (base, tag) = parse_version_switch(&id).unwrap();
        assert!(!base.is_empty());
        assert_eq!(tag, "v2");
    }

    #[test]
    fn test_explicit_metadata_tag_wins() {
        let mut meta = Metadata::new();
        meta.set(VERSION_SWITCH_KEY, "v2");

        let id = resolve_request_id("req-1|v1", &mut meta, &IdentityPolicy::new(false));
        assert_eq!(id, "req-1|v2");
        assert_eq!(meta.get(VERSION_SWITCH_KEY), Some("v2"));
    }

    #[test]
    fn test_embedded_tag_copied_to_metadata() {
        let mut meta = Metadata::new();

        let id = resolve_request_id("req-1|v1", &mut meta, &IdentityPolicy::new(false));
        assert_eq!(id, "req-1|v1");
        assert_eq!(meta.get(VERSION_SWITCH_KEY), Some("v1"));
    }

    #[test]
    fn test_header_override_honored_by_policy() {
        let mut meta = Metadata::new();
        meta.set(HEADER_REQUEST_ID, "fixture-id");

        let id = resolve_request_id("caller-id", &mut meta, &IdentityPolicy::new(true));
        assert_eq!(id, "fixture-id");

        let mut meta = Metadata::new();
        meta.set(HEADER_REQUEST_ID, "fixture-id");
        let id = resolve_request_id("caller-id", &mut meta, &IdentityPolicy::new(false));
        assert_eq!(id, "caller-id");
    }

    #[test]
    fn test_empty_id_is_minted() {
        let mut meta = Metadata::new();
        let id = resolve_request_id("", &mut meta, &IdentityPolicy::new(false));
        assert!(!id.is_empty());
    }

    #[test]
    fn test_minted_ids_unique_under_concurrency() {
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let seen = seen.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1250 {
                    let mut meta = Metadata::new();
                    let id = resolve_request_id("", &mut meta, &IdentityPolicy::new(false));
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
