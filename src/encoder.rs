//! Turning builder state into a wire-level `reqwest::Request`.

use crate::{body::RequestBody, Error, Result};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method};
use tokio_util::io::ReaderStream;
use url::Url;

/// The content type attached to serialized structured bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Builds wire requests from a method, URL, body and headers.
///
/// Implementations must be stateless or immutable: one encoder is shared by
/// every request made through a [`Transport`](crate::Transport).
pub trait RequestEncoder: Send + Sync {
    /// Encodes one request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if a structured body cannot be
    /// serialized.
    fn encode(
        &self,
        method: Method,
        url: Url,
        body: Option<RequestBody>,
        headers: &HeaderMap,
    ) -> Result<reqwest::Request>;
}

/// When the JSON encoder sets `Content-Type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentTypePolicy {
    /// Only when the body came from structured serialization.
    #[default]
    StructuredOnly,
    /// On every request, whatever the body.
    Always,
}

/// The default encoder: structured bodies become JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRequestEncoder {
    content_type_policy: ContentTypePolicy,
}

impl JsonRequestEncoder {
    /// Creates an encoder with [`ContentTypePolicy::StructuredOnly`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy using the given content-type policy.
    pub fn with_content_type_policy(self, policy: ContentTypePolicy) -> Self {
        Self {
            content_type_policy: policy,
        }
    }

    /// The configured content-type policy.
    pub fn content_type_policy(&self) -> ContentTypePolicy {
        self.content_type_policy
    }
}

impl RequestEncoder for JsonRequestEncoder {
    fn encode(
        &self,
        method: Method,
        url: Url,
        body: Option<RequestBody>,
        headers: &HeaderMap,
    ) -> Result<reqwest::Request> {
        let structured = body.as_ref().is_some_and(RequestBody::is_structured);

        let wire_body = match body {
            None => None,
            Some(RequestBody::Text(text)) => Some(reqwest::Body::from(text)),
            Some(RequestBody::Bytes(bytes)) => Some(reqwest::Body::from(bytes)),
            Some(RequestBody::Reader(reader)) => {
                Some(reqwest::Body::wrap_stream(ReaderStream::new(reader)))
            }
            Some(RequestBody::Json(value)) => {
                let content = serde_json::to_vec(&value)
                    .map_err(|e| Error::SerializationFailed(e.to_string()))?;
                Some(reqwest::Body::from(Bytes::from(content)))
            }
        };

        let mut request = reqwest::Request::new(method, url);
        *request.body_mut() = wire_body;

        let request_headers = request.headers_mut();
        for (name, value) in headers {
            request_headers.append(name.clone(), value.clone());
        }

        let set_content_type = match self.content_type_policy {
            ContentTypePolicy::StructuredOnly => structured,
            ContentTypePolicy::Always => true,
        };
        if set_content_type {
            request_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://api.example.com/widgets").unwrap()
    }

    #[test]
    fn test_structured_body_sets_content_type() {
        let request = JsonRequestEncoder::new()
            .encode(
                Method::POST,
                url(),
                Some(RequestBody::Json(serde_json::json!({"id": 1}))),
                &HeaderMap::new(),
            )
            .unwrap();

        assert_eq!(request.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
        let body = request.body().and_then(reqwest::Body::as_bytes).unwrap();
        assert_eq!(body, br#"{"id":1}"#);
    }

    #[test]
    fn test_raw_body_leaves_content_type_alone() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let request = JsonRequestEncoder::new()
            .encode(Method::PUT, url(), Some("hello".into()), &headers)
            .unwrap();

        assert_eq!(request.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(
            request.body().and_then(reqwest::Body::as_bytes),
            Some(&b"hello"[..])
        );
    }

    #[test]
    fn test_always_policy_sets_content_type_without_body() {
        let request = JsonRequestEncoder::new()
            .with_content_type_policy(ContentTypePolicy::Always)
            .encode(Method::GET, url(), None, &HeaderMap::new())
            .unwrap();

        assert_eq!(request.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert!(request.body().is_none());
    }

    #[test]
    fn test_multi_valued_headers_are_appended() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));

        let request = JsonRequestEncoder::new()
            .encode(Method::GET, url(), None, &headers)
            .unwrap();

        let values: Vec<_> = request.headers().get_all("x-tag").iter().collect();
        assert_eq!(values, vec!["a", "b"]);
    }
}
