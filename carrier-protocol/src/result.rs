//! Call result envelope.

use crate::metadata::Metadata;
use crate::status::{ErrorCode, StatusError};
use crate::MIME_JSON;
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// Body decoder selected from the response content type.
///
/// Only JSON is mandatory; additional formats are added as variants without
/// changing call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyCodec {
    Json,
}

impl BodyCodec {
    /// Selects a codec for a content type, if one is known.
    pub fn for_content_type(content_type: &str) -> Option<BodyCodec> {
        if content_type.contains(MIME_JSON) {
            return Some(BodyCodec::Json);
        }
        None
    }

    /// Decodes a body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, StatusError> {
        match self {
            BodyCodec::Json => serde_json::from_slice(data).map_err(|e| {
                StatusError::new(ErrorCode::InvalidResponseBody, "response body decode failed")
                    .with_desc(e.to_string())
            }),
        }
    }
}

/// Outcome of one request execution.
///
/// A result with an error still carries whatever partial data and metadata
/// were obtained, e.g. a server-declared structured error body.
#[derive(Debug, Clone, Default)]
pub struct CallResult {
    /// Raw response bytes.
    pub data: Bytes,
    /// Response metadata.
    pub meta: Metadata,
    /// Decode capability selected by the response content type.
    pub codec: Option<BodyCodec>,
    /// Structured error, if the call failed.
    pub err: Option<StatusError>,
}

impl CallResult {
    /// Builds a successful result.
    pub fn ok(data: Bytes, meta: Metadata, codec: Option<BodyCodec>) -> Self {
        Self {
            data,
            meta,
            codec,
            err: None,
        }
    }

    /// Builds a failed result with no response data.
    pub fn fail(err: StatusError) -> Self {
        Self {
            err: Some(err),
            ..Default::default()
        }
    }

    /// Returns whether the call succeeded.
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// Decodes the response body using the selected codec.
    ///
    /// Surfaces the stored call error first; a body without a known codec
    /// yields `UNSUPPORTED_MEDIA_TYPE`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StatusError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let codec = self.codec.ok_or_else(|| {
            StatusError::new(
                ErrorCode::UnsupportedMediaType,
                "no decoder for response content type",
            )
        })?;
        codec.decode(&self.data)
    }

    /// Converts into a `Result`, keeping the envelope on success.
    pub fn into_result(self) -> Result<CallResult, StatusError> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Pong {
        pong: bool,
    }

    #[test]
    fn test_codec_selection() {
        assert_eq!(
            BodyCodec::for_content_type("application/json; charset=utf-8"),
            Some(BodyCodec::Json)
        );
        assert_eq!(BodyCodec::for_content_type("text/plain"), None);
        assert_eq!(BodyCodec::for_content_type(""), None);
    }

    #[test]
    fn test_decode_json() {
        let result = CallResult::ok(
            Bytes::from_static(br#"{"pong":true}"#),
            Metadata::new(),
            Some(BodyCodec::Json),
        );
        assert_eq!(result.decode::<Pong>().unwrap(), Pong { pong: true });
    }

    #[test]
    fn test_decode_without_codec() {
        let result = CallResult::ok(Bytes::from_static(b"pong"), Metadata::new(), None);
        let err = result.decode::<Pong>().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedMediaType);
    }

    #[test]
    fn test_decode_surfaces_call_error() {
        let result = CallResult::fail(StatusError::new(ErrorCode::RequestTimeout, "timed out"));
        let err = result.decode::<Pong>().unwrap_err();
        assert_eq!(err.code, ErrorCode::RequestTimeout);
    }

    #[test]
    fn test_failed_result_keeps_partial_data() {
        let mut meta = Metadata::new();
        meta.add("content-type", "application/json");
        let result = CallResult {
            data: Bytes::from_static(br#"{"code":"NOT_FOUND","message":"gone"}"#),
            meta,
            codec: Some(BodyCodec::Json),
            err: Some(StatusError::new(ErrorCode::NotFound, "gone")),
        };
        assert!(!result.is_ok());
        assert!(!result.data.is_empty());
        assert!(result.meta.has("content-type"));
    }
}
