//! Request body variants.

use bytes::Bytes;
use std::fmt;
use tokio::io::AsyncRead;

/// A reader that can be streamed as a request body.
pub type BodyReader = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// The body attached to a request.
///
/// Text and byte bodies are sent as-is. A reader is streamed (and buffered
/// once if the call may be retried). A JSON body is serialized by the
/// [`RequestEncoder`](crate::encoder::RequestEncoder), which is also the only
/// variant that triggers the JSON `Content-Type`.
pub enum RequestBody {
    /// UTF-8 text, sent without touching headers.
    Text(String),
    /// Raw bytes, sent without touching headers.
    Bytes(Bytes),
    /// A one-shot reader, passed through verbatim.
    Reader(BodyReader),
    /// A structured value pending serialization.
    Json(serde_json::Value),
}

impl RequestBody {
    /// Returns `true` for the structured variant.
    pub fn is_structured(&self) -> bool {
        matches!(self, RequestBody::Json(_))
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Text(text) => f.debug_tuple("Text").field(text).finish(),
            RequestBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            RequestBody::Reader(_) => f.write_str("Reader(..)"),
            RequestBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes.into())
    }
}

impl From<&'static [u8]> for RequestBody {
    fn from(bytes: &'static [u8]) -> Self {
        RequestBody::Bytes(Bytes::from_static(bytes))
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}
