//! The transport: encoder, round-tripper and decoder behind one value.
//!
//! A [`Transport`] is immutable. The `with_*` methods return a new transport
//! that shares the untouched parts, so one transport can be cloned into any
//! number of tasks and used concurrently.

use crate::{
    decoder::{JsonResponseDecoder, ResponseDecoder},
    encoder::{JsonRequestEncoder, RequestEncoder},
    error::ConfigError,
    request::RequestBuilder,
    Error, Result,
};
use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Sends one request and returns one response.
///
/// Implementations must return `Ok` whenever a response was obtained,
/// whatever its status code. `Err` is reserved for failing to get a response
/// at all.
#[async_trait]
pub trait RoundTripper: Send + Sync {
    /// Executes a single HTTP transaction.
    async fn round_trip(&self, request: reqwest::Request) -> Result<reqwest::Response>;
}

#[async_trait]
impl RoundTripper for reqwest::Client {
    async fn round_trip(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        self.execute(request).await.map_err(Error::from_reqwest)
    }
}

/// The pluggable pieces used to execute requests.
///
/// # Examples
///
/// ```no_run
/// use restcall::{Context, Transport};
/// use restcall::encoder::{ContentTypePolicy, JsonRequestEncoder};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Pod {
///     name: String,
/// }
///
/// # async fn example() -> Result<(), restcall::Error> {
/// let transport = Transport::new().with_encoder(
///     JsonRequestEncoder::new().with_content_type_policy(ContentTypePolicy::Always),
/// );
///
/// let pod: Option<Pod> = transport
///     .get()
///     .endpoint("https://api.example.com")
///     .prefix(["api", "v1"])
///     .resource("pods")
///     .name("nginx")
///     .call(&Context::background(), &[])
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Transport {
    encoder: Arc<dyn RequestEncoder>,
    round_tripper: Arc<dyn RoundTripper>,
    decoder: Arc<dyn ResponseDecoder>,
}

impl Transport {
    /// A transport with the JSON codecs and a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::from_parts(
            JsonRequestEncoder::new(),
            reqwest::Client::new(),
            JsonResponseDecoder::new(),
        )
    }

    /// Creates a `TransportBuilder` for configuring the HTTP client.
    pub fn builder() -> TransportBuilder {
        TransportBuilder::new()
    }

    /// Assembles a transport from its three parts.
    pub fn from_parts(
        encoder: impl RequestEncoder + 'static,
        round_tripper: impl RoundTripper + 'static,
        decoder: impl ResponseDecoder + 'static,
    ) -> Self {
        Self {
            encoder: Arc::new(encoder),
            round_tripper: Arc::new(round_tripper),
            decoder: Arc::new(decoder),
        }
    }

    /// Returns a copy using `encoder`.
    pub fn with_encoder(&self, encoder: impl RequestEncoder + 'static) -> Self {
        Self {
            encoder: Arc::new(encoder),
            round_tripper: self.round_tripper.clone(),
            decoder: self.decoder.clone(),
        }
    }

    /// Returns a copy using `round_tripper`.
    pub fn with_round_tripper(&self, round_tripper: impl RoundTripper + 'static) -> Self {
        Self {
            encoder: self.encoder.clone(),
            round_tripper: Arc::new(round_tripper),
            decoder: self.decoder.clone(),
        }
    }

    /// Returns a copy using `decoder`.
    pub fn with_decoder(&self, decoder: impl ResponseDecoder + 'static) -> Self {
        Self {
            encoder: self.encoder.clone(),
            round_tripper: self.round_tripper.clone(),
            decoder: Arc::new(decoder),
        }
    }

    /// The request encoder.
    pub fn encoder(&self) -> &dyn RequestEncoder {
        self.encoder.as_ref()
    }

    /// The round-tripper.
    pub fn round_tripper(&self) -> &dyn RoundTripper {
        self.round_tripper.as_ref()
    }

    /// The response decoder.
    pub fn decoder(&self) -> &dyn ResponseDecoder {
        self.decoder.as_ref()
    }

    /// Starts a request with the given method.
    pub fn method(&self, method: Method) -> RequestBuilder {
        RequestBuilder::new(self.clone(), method)
    }

    /// Starts a GET request.
    pub fn get(&self) -> RequestBuilder {
        self.method(Method::GET)
    }

    /// Starts a POST request.
    pub fn post(&self) -> RequestBuilder {
        self.method(Method::POST)
    }

    /// Starts a PUT request.
    pub fn put(&self) -> RequestBuilder {
        self.method(Method::PUT)
    }

    /// Starts a DELETE request.
    pub fn delete(&self) -> RequestBuilder {
        self.method(Method::DELETE)
    }

    /// Starts a PATCH request.
    pub fn patch(&self) -> RequestBuilder {
        self.method(Method::PATCH)
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

#[async_trait]
impl RoundTripper for Transport {
    async fn round_trip(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        self.round_tripper.round_trip(request).await
    }
}

static DEFAULT_TRANSPORT: OnceLock<Transport> = OnceLock::new();

/// The process-wide default transport, created on first use.
pub fn default_transport() -> &'static Transport {
    DEFAULT_TRANSPORT.get_or_init(Transport::new)
}

/// Starts a request with the given method on the default transport.
///
/// # Examples
///
/// ```no_run
/// use restcall::Context;
///
/// # async fn example() -> Result<(), restcall::Error> {
/// restcall::method(http::Method::DELETE)
///     .endpoint("https://api.example.com")
///     .resource("widgets")
///     .name("42")
///     .call_nop(&Context::background(), &[])
///     .await?;
/// # Ok(())
/// # }
/// ```
pub fn method(method: Method) -> RequestBuilder {
    default_transport().method(method)
}

/// Builder for a [`Transport`] backed by a configured `reqwest::Client`.
///
/// # Examples
///
/// ```no_run
/// use restcall::Transport;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), restcall::Error> {
/// let transport = Transport::builder()
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct TransportBuilder {
    default_headers: HeaderMap,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    encoder: Arc<dyn RequestEncoder>,
    decoder: Arc<dyn ResponseDecoder>,
}

impl TransportBuilder {
    /// Creates a new `TransportBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            default_headers: HeaderMap::new(),
            timeout: None,
            connect_timeout: None,
            encoder: Arc::new(JsonRequestEncoder::new()),
            decoder: Arc::new(JsonResponseDecoder::new()),
        }
    }

    /// Adds a header sent with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let invalid = |reason: String| ConfigError::InvalidHeader {
            name: name.as_ref().to_string(),
            reason,
        };
        let header_name =
            HeaderName::try_from(name.as_ref()).map_err(|e| invalid(e.to_string()))?;
        let header_value =
            HeaderValue::try_from(value.as_ref()).map_err(|e| invalid(e.to_string()))?;
        self.default_headers.append(header_name, header_value);
        Ok(self)
    }

    /// Sets the `User-Agent` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid header value.
    pub fn user_agent(self, user_agent: impl AsRef<str>) -> Result<Self> {
        self.default_header(http::header::USER_AGENT.as_str(), user_agent)
    }

    /// Sets the per-attempt timeout of the HTTP client.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout of the HTTP client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the request encoder.
    pub fn encoder(mut self, encoder: impl RequestEncoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Sets the response decoder.
    pub fn decoder(mut self, decoder: impl ResponseDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Builds the configured `Transport`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<Transport> {
        let mut client = reqwest::Client::builder().default_headers(self.default_headers);
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            client = client.connect_timeout(timeout);
        }
        let client = client
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Transport {
            encoder: self.encoder,
            round_tripper: Arc::new(client),
            decoder: self.decoder,
        })
    }
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
