//! The fluent request builder.
//!
//! A [`RequestBuilder`] accumulates URL parts, query parameters, headers, a
//! body and a retry policy. Mistakes made while configuring it (an invalid
//! resource name, a field set twice, a body that fails to serialize) do not
//! interrupt the chain. They are recorded and returned together from the
//! terminal call, before any network traffic happens.
//!
//! Every configuration method takes the builder by value and returns it, and
//! every terminal method consumes it, so a builder is executed at most once.

use crate::{
    body::{BodyReader, RequestBody},
    context::Context,
    decoder::{ResponseHook, Sink},
    encoder::JSON_CONTENT_TYPE,
    error::{ConfigError, ConfigErrors},
    path,
    response::{Response, ResponseStream},
    retry::{RetryPolicy, RetryPredicate, RetryStrategy},
    segment::validate_path_segment,
    transport::Transport,
    Error, Result,
};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::io::AsyncRead;
use url::Url;

/// Builds and executes one REST call.
///
/// Obtain one from [`Transport::method`] (or `get`, `post`, ...), or from
/// [`crate::method`] for the default transport.
///
/// # Examples
///
/// ```no_run
/// use restcall::retry::RetryOn5xx;
/// use restcall::{Context, RetryStrategy, Transport};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct ListOptions {
///     #[serde(rename = "labelSelector")]
///     label_selector: String,
///     limit: u32,
/// }
///
/// #[derive(Deserialize)]
/// struct PodList {
///     items: Vec<serde_json::Value>,
/// }
///
/// # async fn example() -> Result<(), restcall::Error> {
/// let pods: Option<PodList> = Transport::new()
///     .get()
///     .endpoint("https://api.example.com")
///     .prefix(["api", "v1"])
///     .resource("pods")
///     .queries(&ListOptions {
///         label_selector: "app=web".to_string(),
///         limit: 50,
///     })
///     .header("Accept", ["application/json"])
///     .retry(
///         RetryStrategy::Linear {
///             delay: Duration::from_millis(200),
///             max_retries: 2,
///         },
///         RetryOn5xx,
///     )
///     .call(&Context::background(), &[])
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    transport: Transport,
    method: Method,
    base_url: Option<Url>,
    path_prefix: String,
    sub_path: String,
    resource: String,
    resource_name: String,
    subresource: String,
    params: BTreeMap<String, Vec<String>>,
    headers: HeaderMap,
    body: Option<RequestBody>,
    retry: RetryPolicy,
    errors: ConfigErrors,
}

impl RequestBuilder {
    /// Creates an empty builder for `method` on `transport`.
    pub fn new(transport: Transport, method: Method) -> Self {
        Self {
            transport,
            method,
            base_url: None,
            path_prefix: String::new(),
            sub_path: String::new(),
            resource: String::new(),
            resource_name: String::new(),
            subresource: String::new(),
            params: BTreeMap::new(),
            headers: HeaderMap::new(),
            body: None,
            retry: RetryPolicy::default(),
            errors: ConfigErrors::new(),
        }
    }

    /// The configuration problems recorded so far.
    pub fn config_errors(&self) -> &ConfigErrors {
        &self.errors
    }

    /// Sets the base URL. An empty string leaves the builder unchanged.
    pub fn endpoint(mut self, endpoint: impl AsRef<str>) -> Self {
        let endpoint = endpoint.as_ref();
        if endpoint.is_empty() {
            return self;
        }
        match Url::parse(endpoint) {
            Ok(url) => self.base_url = Some(url),
            Err(source) => {
                self.base_url = None;
                self.errors.push(ConfigError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    source,
                });
            }
        }
        self
    }

    /// Appends path segments before the resource.
    ///
    /// A trailing `/` on the last segment is kept as long as nothing is
    /// joined after the prefix.
    pub fn prefix<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<S> = segments.into_iter().collect();
        let addition = path::join(&segments);
        if addition.is_empty() {
            return self;
        }

        let trailing = segments
            .iter()
            .rev()
            .map(|s| s.as_ref())
            .find(|s: &&str| !s.is_empty())
            .is_some_and(|s| s.ends_with('/'));

        let mut prefix = path::join(&[self.path_prefix.as_str(), addition.as_str()]);
        if trailing && !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.path_prefix = prefix;
        self
    }

    /// Appends path segments after the resource name and subresource.
    pub fn suffix<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<S> = segments.into_iter().collect();
        let addition = path::join(&segments);
        self.sub_path = path::join(&[self.sub_path.as_str(), addition.as_str()]);
        self
    }

    /// Sets the resource. Can only be set once.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        if !self.resource.is_empty() {
            self.errors.push(ConfigError::AlreadySet {
                field: "resource",
                current: self.resource.clone(),
                attempted: resource,
            });
            return self;
        }
        if self.record_invalid_segment("resource", &resource) {
            return self;
        }
        self.resource = resource;
        self
    }

    /// Sets the resource name. Can only be set once and may not be empty.
    pub fn name(mut self, resource_name: impl Into<String>) -> Self {
        let resource_name = resource_name.into();
        if resource_name.is_empty() {
            self.errors.push(ConfigError::EmptyName);
            return self;
        }
        if !self.resource_name.is_empty() {
            self.errors.push(ConfigError::AlreadySet {
                field: "resource name",
                current: self.resource_name.clone(),
                attempted: resource_name,
            });
            return self;
        }
        if self.record_invalid_segment("resource name", &resource_name) {
            return self;
        }
        self.resource_name = resource_name;
        self
    }

    /// Sets the subresource from one or more segments. Can only be set once.
    pub fn subresource<I, S>(mut self, subresources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let subresources: Vec<S> = subresources.into_iter().collect();
        let subresource = path::join(&subresources);
        if !self.subresource.is_empty() {
            self.errors.push(ConfigError::AlreadySet {
                field: "subresource",
                current: self.subresource.clone(),
                attempted: subresource,
            });
            return self;
        }

        let mut invalid = false;
        for segment in &subresources {
            invalid |= self.record_invalid_segment("subresource", segment.as_ref());
        }
        if !invalid {
            self.subresource = subresource;
        }
        self
    }

    fn record_invalid_segment(&mut self, field: &'static str, value: &str) -> bool {
        let reasons = validate_path_segment(value);
        if reasons.is_empty() {
            return false;
        }
        self.errors.push(ConfigError::InvalidSegment {
            field,
            value: value.to_string(),
            reasons,
        });
        true
    }

    /// Appends `values` under `key`, or removes `key` when `values` is empty.
    ///
    /// An empty key is ignored.
    pub fn query<I, V>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let key = key.into();
        if key.is_empty() {
            return self;
        }
        let mut values = values.into_iter().map(Into::into).peekable();
        if values.peek().is_none() {
            self.params.remove(&key);
            return self;
        }
        self.params.entry(key).or_default().extend(values);
        self
    }

    /// Removes every value stored under `key`.
    pub fn remove_query(mut self, key: &str) -> Self {
        self.params.remove(key);
        self
    }

    /// Merges a structured value into the query parameters.
    ///
    /// Field names follow serde (`#[serde(rename = "...")]` picks the query
    /// key, `None` fields are skipped). Sequence values, in struct fields or
    /// map entries, repeat the key. A value already present under a key is
    /// not added again.
    pub fn queries<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_html_form::to_string(value) {
            Ok(encoded) => {
                for (key, value) in url::form_urlencoded::parse(encoded.as_bytes()) {
                    let values = self.params.entry(key.into_owned()).or_default();
                    if !values.iter().any(|existing| *existing == value) {
                        values.push(value.into_owned());
                    }
                }
            }
            Err(e) => self.errors.push(ConfigError::QueryEncoding(e.to_string())),
        }
        self
    }

    /// Merges `headers` into the request headers, skipping values already present.
    pub fn headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            let present = self.headers.get_all(name).iter().any(|existing| existing == value);
            if !present {
                self.headers.append(name.clone(), value.clone());
            }
        }
        self
    }

    /// Appends `values` under `key`, or removes `key` when `values` is empty.
    ///
    /// An empty key is ignored. Invalid names or values are recorded as
    /// configuration errors.
    pub fn header<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        if key.is_empty() {
            return self;
        }
        let name = match HeaderName::try_from(key) {
            Ok(name) => name,
            Err(e) => {
                self.errors.push(ConfigError::InvalidHeader {
                    name: key.to_string(),
                    reason: e.to_string(),
                });
                return self;
            }
        };

        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            self.headers.remove(&name);
            return self;
        }
        for value in values {
            match HeaderValue::try_from(value.as_ref()) {
                Ok(value) => {
                    self.headers.append(name.clone(), value);
                }
                Err(e) => self.errors.push(ConfigError::InvalidHeader {
                    name: key.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        self
    }

    /// Sets a text or byte body. Headers are not touched.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Streams the request body from `reader`.
    ///
    /// When the call may be retried, the reader is read to the end once before
    /// the first attempt.
    pub fn body_reader(mut self, reader: impl AsyncRead + Send + Sync + Unpin + 'static) -> Self {
        let reader: BodyReader = Box::new(reader);
        self.body = Some(RequestBody::Reader(reader));
        self
    }

    /// Serializes `value` as the JSON body and sets `Content-Type`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.body = Some(RequestBody::Json(value));
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            }
            Err(e) => self.errors.push(ConfigError::BodySerialization(e.to_string())),
        }
        self
    }

    /// Retries per `strategy` for as long as `predicate` returns `true`.
    pub fn retry(mut self, strategy: RetryStrategy, predicate: impl RetryPredicate + 'static) -> Self {
        self.retry = RetryPolicy::new(strategy, predicate);
        self
    }

    /// Makes up to `attempts` executions in total, waiting about `interval`
    /// between them, while `predicate` returns `true`.
    pub fn retry_attempts(
        mut self,
        attempts: usize,
        interval: Duration,
        predicate: impl RetryPredicate + 'static,
    ) -> Self {
        if attempts == 0 {
            self.errors.push(ConfigError::InvalidRetryAttempts);
            return self;
        }
        self.retry(RetryStrategy::attempts(attempts, interval), predicate)
    }

    /// Installs a prebuilt retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Assembles the full request URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEndpoint`] if no endpoint was set.
    pub fn url(&self) -> Result<Url> {
        let mut p = self.path_prefix.clone();
        if !self.resource.is_empty() {
            p = path::join(&[p.as_str(), self.resource.as_str()]);
        }
        // join drops trailing slashes; the prefix keeps its own when nothing follows it
        if !self.resource_name.is_empty() || !self.sub_path.is_empty() || !self.subresource.is_empty()
        {
            p = path::join(&[
                p.as_str(),
                self.resource_name.as_str(),
                self.subresource.as_str(),
                self.sub_path.as_str(),
            ]);
        }

        let mut url = self.base_url.clone().ok_or(ConfigError::MissingEndpoint)?;

        let trailing = p.ends_with('/') || (p.is_empty() && url.path().ends_with('/'));
        let mut full_path = path::join(&[url.path(), p.as_str()]);
        if trailing && !full_path.ends_with('/') {
            full_path.push('/');
        }
        url.set_path(&full_path);

        let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in url.query_pairs() {
            query.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        for (key, values) in &self.params {
            query.entry(key.clone()).or_default().extend(values.iter().cloned());
        }

        if query.is_empty() {
            url.set_query(None);
        } else {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, values) in &query {
                for value in values {
                    serializer.append_pair(key, value);
                }
            }
            url.set_query(Some(&serializer.finish()));
        }

        Ok(url)
    }

    /// Executes the call and decodes the body as `T`.
    ///
    /// Returns `Ok(None)` for `204 No Content`. `hooks` replace the decoder's
    /// default status check when non-empty.
    pub async fn call<T>(self, ctx: &Context, hooks: &[ResponseHook]) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        let mut sink: Option<T> = None;
        self.call_into(ctx, &mut sink, hooks).await?;
        Ok(sink)
    }

    /// Executes the call and decodes the body into `sink`.
    pub async fn call_into(
        self,
        ctx: &Context,
        sink: &mut dyn Sink,
        hooks: &[ResponseHook],
    ) -> Result<()> {
        let (transport, response) = self.fetch(ctx).await?;
        transport.decoder().decode(&response, Some(sink), hooks)
    }

    /// Executes the call, runs the response hooks and discards the body.
    pub async fn call_nop(self, ctx: &Context, hooks: &[ResponseHook]) -> Result<()> {
        let (transport, response) = self.fetch(ctx).await?;
        transport.decoder().decode(&response, None, hooks)
    }

    /// Executes the call and returns the raw body, whatever the status.
    pub async fn bytes(self, ctx: &Context) -> Result<Bytes> {
        let (_, response, _) = self.execute(ctx).await?;
        ctx.run(async { response.bytes().await.map_err(Error::from_reqwest) })
            .await
    }

    /// Executes the call and returns the unread response.
    ///
    /// The status is not checked and nothing is decoded. Dropping the stream
    /// releases the connection.
    pub async fn stream(self, ctx: &Context) -> Result<ResponseStream> {
        let (_, response, attempts) = self.execute(ctx).await?;
        Ok(ResponseStream::new(response, attempts))
    }

    async fn fetch(self, ctx: &Context) -> Result<(Transport, Response)> {
        let (transport, response, _) = self.execute(ctx).await?;
        let response = ctx.run(Response::read(response)).await?;
        Ok((transport, response))
    }

    async fn execute(self, ctx: &Context) -> Result<(Transport, reqwest::Response, usize)> {
        if !self.errors.is_empty() {
            return Err(Error::Configuration(self.errors));
        }
        let url = self.url()?;
        let method = self.method.clone();

        let start_time = Instant::now();
        let request = self
            .transport
            .encoder()
            .encode(self.method, url, self.body, &self.headers)?;
        let (response, attempts) = self
            .retry
            .execute(ctx, self.transport.round_tripper(), request)
            .await?;

        tracing::info!(
            method = %method,
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            attempts = attempts,
            "Received HTTP response"
        );

        Ok((self.transport, response, attempts))
    }
}
