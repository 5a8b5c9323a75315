//! Response values handed to hooks, decoders and streaming callers.
//!
//! [`Response`] is a fully buffered response. Hooks and decoders inspect it
//! by reference, which lets the status check read the body before decoding
//! does. [`ResponseStream`] is the live, unread response returned by
//! [`RequestBuilder::stream`](crate::RequestBuilder::stream).

use crate::{Error, Result};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http::{HeaderMap, StatusCode};
use std::borrow::Cow;

/// A buffered HTTP response.
///
/// # Examples
///
/// ```
/// # use restcall::Response;
/// # use http::{HeaderMap, HeaderValue, StatusCode};
/// let mut headers = HeaderMap::new();
/// headers.insert("content-type", HeaderValue::from_static("application/json"));
///
/// let response = Response::new(StatusCode::OK, headers, r#"{"ok":true}"#);
///
/// assert_eq!(response.header("content-type"), Some("application/json"));
/// assert_eq!(response.text(), r#"{"ok":true}"#);
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The complete response body.
    pub body: Bytes,
}

impl Response {
    /// Creates a new `Response`.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Reads the whole body of a wire response.
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Error::from_reqwest)?;
        Ok(Self::new(status, headers, body))
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// A response whose body has not been read yet.
///
/// The connection stays checked out until the stream is dropped or read to
/// the end.
#[derive(Debug)]
pub struct ResponseStream {
    inner: reqwest::Response,
    attempts: usize,
}

impl ResponseStream {
    pub(crate) fn new(inner: reqwest::Response, attempts: usize) -> Self {
        Self { inner, attempts }
    }

    /// The HTTP status code of the response.
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// How many attempts it took to obtain this response.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Reads the next chunk of the body, or `None` at the end.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.inner.chunk().await.map_err(Error::from_reqwest)
    }

    /// Converts the body into a stream of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> {
        self.inner.bytes_stream().map(|chunk| chunk.map_err(Error::from_reqwest))
    }

    /// Gives back the underlying `reqwest` response.
    pub fn into_inner(self) -> reqwest::Response {
        self.inner
    }
}
