//! Validating responses and decoding their bodies.
//!
//! A [`ResponseDecoder`] runs a chain of [`ResponseHook`]s over a buffered
//! [`Response`] and then decodes the body into a caller-provided [`Sink`].
//! The JSON decoder decodes numbers losslessly (`serde_json` is built with
//! `arbitrary_precision`), so large integer IDs survive a round-trip through
//! `serde_json::Value`.

use crate::{Error, Response, Result};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

/// The only media type accepted by [`JsonResponseDecoder`].
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A check run against a response before its body is decoded.
///
/// Hooks run in order and the first error aborts the call.
///
/// # Examples
///
/// ```
/// use restcall::decoder::ResponseHook;
/// use restcall::Error;
/// use std::sync::Arc;
///
/// let require_etag: ResponseHook = Arc::new(|response: &restcall::Response| match response.header("etag") {
///     Some(_) => Ok(()),
///     None => Err(Error::Rejected("missing etag".to_string())),
/// });
/// ```
pub type ResponseHook = Arc<dyn Fn(&Response) -> Result<()> + Send + Sync>;

/// A destination for decoded response content.
///
/// Implemented for `Option<T>`: a successful decode stores `Some(value)`.
pub trait Sink: Send {
    /// Decodes a JSON document into this sink.
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()>;
}

impl<T: DeserializeOwned + Send> Sink for Option<T> {
    fn decode_json(&mut self, body: &[u8]) -> serde_json::Result<()> {
        *self = Some(serde_json::from_slice(body)?);
        Ok(())
    }
}

/// Validates and decodes responses.
pub trait ResponseDecoder: Send + Sync {
    /// Applies `hooks` (or the decoder's defaults when `hooks` is empty) and
    /// decodes the body into `sink`, if one was given.
    fn decode(
        &self,
        response: &Response,
        sink: Option<&mut dyn Sink>,
        hooks: &[ResponseHook],
    ) -> Result<()>;
}

/// The error envelope servers put in non-success bodies.
///
/// A body only counts as an envelope when it carries `code` or `message`.
#[derive(Debug, Deserialize)]
struct UpstreamEnvelope {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    result: serde_json::Value,
}

/// Returns a hook that fails unless the response has status `expected`.
///
/// The failure is [`Error::Upstream`] when the body is a JSON error envelope
/// (`code`, `message`, `result`), otherwise [`Error::HttpError`] with the raw
/// body.
pub fn expect_status(expected: StatusCode) -> ResponseHook {
    Arc::new(move |response: &Response| {
        if response.status == expected {
            return Ok(());
        }

        match serde_json::from_slice::<UpstreamEnvelope>(&response.body) {
            Ok(envelope) if envelope.code.is_some() || envelope.message.is_some() => {
                Err(Error::Upstream {
                    status: response.status,
                    code: envelope.code.unwrap_or_default(),
                    message: envelope.message.unwrap_or_default(),
                    result: envelope.result,
                })
            }
            _ => Err(Error::HttpError {
                status: response.status,
                raw_response: response.text().into_owned(),
                headers: response.headers.clone(),
            }),
        }
    })
}

/// The hooks used when a call supplies none: expect `200 OK`.
pub fn default_hooks() -> Vec<ResponseHook> {
    vec![expect_status(StatusCode::OK)]
}

/// Extracts the lowercase media type from a `Content-Type` value.
fn media_type(content_type: &str) -> Option<String> {
    let media_type = content_type.split(';').next()?.trim();
    let (kind, subtype) = media_type.split_once('/')?;
    if kind.is_empty() || subtype.is_empty() || subtype.contains('/') {
        return None;
    }
    Some(media_type.to_ascii_lowercase())
}

/// The default decoder: JSON bodies, `200 OK` unless told otherwise.
#[derive(Clone)]
pub struct JsonResponseDecoder {
    default_hooks: Vec<ResponseHook>,
}

impl JsonResponseDecoder {
    /// Creates a decoder whose default hooks expect `200 OK`.
    pub fn new() -> Self {
        Self {
            default_hooks: default_hooks(),
        }
    }

    /// Runs `hooks` instead of the `200 OK` check when a call supplies none.
    pub fn with_default_hooks(mut self, hooks: Vec<ResponseHook>) -> Self {
        self.default_hooks = hooks;
        self
    }

    fn check_content_type(response: &Response) -> Result<()> {
        let content_type = response.header(CONTENT_TYPE.as_str()).unwrap_or_default();
        match media_type(content_type) {
            Some(media) if media == JSON_MEDIA_TYPE => Ok(()),
            Some(media) => Err(Error::UnsupportedContentType(media)),
            None => Err(Error::UnsupportedContentType(content_type.to_string())),
        }
    }
}

impl Default for JsonResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JsonResponseDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonResponseDecoder")
            .field("default_hooks", &self.default_hooks.len())
            .finish()
    }
}

impl ResponseDecoder for JsonResponseDecoder {
    fn decode(
        &self,
        response: &Response,
        sink: Option<&mut dyn Sink>,
        hooks: &[ResponseHook],
    ) -> Result<()> {
        if response.status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let hooks = if hooks.is_empty() {
            self.default_hooks.as_slice()
        } else {
            hooks
        };
        for hook in hooks {
            hook(response)?;
        }

        let Some(sink) = sink else {
            return Ok(());
        };

        Self::check_content_type(response)?;

        sink.decode_json(&response.body).map_err(|e| {
            tracing::error!(
                error = %e,
                raw_response = %response.text(),
                "Failed to deserialize response"
            );
            Error::DeserializationFailed {
                raw_response: response.text().into_owned(),
                serde_error: e.to_string(),
                status: response.status,
            }
        })
    }
}
