//! Error types for building and executing REST calls.
//!
//! Problems found while a [`RequestBuilder`](crate::RequestBuilder) is being
//! configured are collected as [`ConfigError`]s and only reported when a
//! terminal call runs. Everything that goes wrong afterwards (network, status
//! checks, decoding) is an [`Error`].

use http::{HeaderMap, StatusCode};
use std::fmt;

/// A problem detected while configuring a request.
///
/// These never abort the builder chain. They accumulate in [`ConfigErrors`]
/// and surface as [`Error::Configuration`] from the terminal call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A resource, name or subresource is not a valid path segment.
    #[error("invalid {field} {value:?}: {}", reasons.join(", "))]
    InvalidSegment {
        /// Which builder field was being set.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Every rule the value violated.
        reasons: Vec<String>,
    },

    /// A write-once field was set twice.
    #[error("{field} already set to {current:?}, cannot change to {attempted:?}")]
    AlreadySet {
        /// Which builder field was being set.
        field: &'static str,
        /// The value that stays in place.
        current: String,
        /// The value that was refused.
        attempted: String,
    },

    /// `name("")` was called.
    #[error("resource name may not be empty")]
    EmptyName,

    /// The endpoint could not be parsed as an absolute URL.
    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        /// The rejected endpoint string.
        endpoint: String,
        /// The parse failure.
        source: url::ParseError,
    },

    /// No endpoint was configured before the URL had to be assembled.
    #[error("no endpoint configured")]
    MissingEndpoint,

    /// A header name or value is not valid HTTP.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader {
        /// The header name as given.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A structured value could not be encoded as query parameters.
    #[error("failed to encode query: {0}")]
    QueryEncoding(String),

    /// A structured body could not be serialized.
    #[error("failed to serialize body: {0}")]
    BodySerialization(String),

    /// `retry_attempts` was called with zero attempts.
    #[error("attempts must be greater than 0")]
    InvalidRetryAttempts,

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// All configuration problems recorded by a builder, in the order they occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigErrors(Vec<ConfigError>);

impl ConfigErrors {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Records another problem.
    pub fn push(&mut self, error: ConfigError) {
        self.0.push(error);
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded problems.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the recorded problems.
    pub fn iter(&self) -> std::slice::Iter<'_, ConfigError> {
        self.0.iter()
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

impl From<ConfigError> for ConfigErrors {
    fn from(error: ConfigError) -> Self {
        Self(vec![error])
    }
}

impl<'a> IntoIterator for &'a ConfigErrors {
    type Item = &'a ConfigError;
    type IntoIter = std::slice::Iter<'a, ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The main error type for REST calls.
///
/// # Examples
///
/// ```no_run
/// use restcall::{Context, Error, Transport};
///
/// # async fn example() -> Result<(), Error> {
/// let transport = Transport::new();
/// let result = transport
///     .get()
///     .endpoint("https://api.example.com")
///     .resource("widgets")
///     .name("42")
///     .call::<serde_json::Value>(&Context::background(), &[])
///     .await;
///
/// match result {
///     Ok(widget) => println!("widget: {:?}", widget),
///     Err(Error::Upstream { code, message, .. }) => eprintln!("{code}: {message}"),
///     Err(Error::Configuration(errors)) => eprintln!("bad request setup: {errors}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The builder was misconfigured. Carries every recorded problem.
    #[error("Configuration error: {0}")]
    Configuration(ConfigErrors),

    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The call's deadline expired.
    #[error("Request timed out")]
    Timeout,

    /// The call's context was cancelled.
    #[error("Request canceled")]
    Canceled,

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// The wire request could not be constructed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered with an unexpected status and an error envelope.
    #[error("code:{code}, message:{message}, result:{result}")]
    Upstream {
        /// The HTTP status code
        status: StatusCode,
        /// Upstream error code
        code: String,
        /// Upstream error message
        message: String,
        /// Opaque upstream payload
        result: serde_json::Value,
    },

    /// The server answered with an unexpected status and no error envelope.
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// The response is not JSON.
    #[error("can't parse content-type {0}")]
    UnsupportedContentType(String),

    /// Failed to deserialize the response body into the expected type.
    ///
    /// This error preserves both the raw response text and the serde error message.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// A caller-supplied response hook refused the response.
    #[error("Response rejected: {0}")]
    Rejected(String),
}

impl Error {
    /// Maps a `reqwest` failure, keeping timeouts distinguishable.
    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(error)
        }
    }

    /// Returns `true` if this error is potentially retryable.
    ///
    /// Network errors, timeouts, and 5xx/429 statuses are considered retryable.
    /// Cancellation, configuration and decoding problems are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use restcall::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     raw_response: "try later".to_string(),
    ///     headers: http::HeaderMap::new(),
    /// };
    /// assert!(err.is_retryable());
    /// assert!(!Error::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Timeout => true,
            Error::HttpError { status, .. } | Error::Upstream { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Error::Canceled
            | Error::Configuration(_)
            | Error::SerializationFailed(_)
            | Error::InvalidRequest(_)
            | Error::UnsupportedContentType(_)
            | Error::DeserializationFailed { .. }
            | Error::Rejected(_) => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. }
            | Error::Upstream { status, .. }
            | Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns the configuration problems if this is [`Error::Configuration`].
    pub fn config_errors(&self) -> Option<&ConfigErrors> {
        match self {
            Error::Configuration(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Self {
        Error::Configuration(error.into())
    }
}

/// A specialized `Result` type for REST calls.
pub type Result<T> = std::result::Result<T, Error>;
