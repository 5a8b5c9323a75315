//! Presets for calls that all target the same endpoint and resource.

use crate::{
    decoder::ResponseDecoder,
    encoder::RequestEncoder,
    request::RequestBuilder,
    transport::{default_transport, RoundTripper, Transport},
};
use http::Method;

/// An endpoint and resource pair, bound to a transport with [`to`](Self::to)
/// or [`to_transport`](Self::to_transport).
///
/// # Examples
///
/// ```no_run
/// use restcall::{Context, ResourceHandle};
///
/// # async fn example() -> Result<(), restcall::Error> {
/// let pods = ResourceHandle::new("https://api.example.com", "pods").to();
///
/// pods.delete()
///     .prefix(["api", "v1"])
///     .name("nginx")
///     .call_nop(&Context::background(), &[])
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceHandle {
    endpoint: String,
    resource: String,
}

impl ResourceHandle {
    /// Creates a handle for `resource` under `endpoint`.
    pub fn new(endpoint: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            resource: resource.into(),
        }
    }

    /// Returns a copy with a different endpoint.
    pub fn endpoint(&self, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            resource: self.resource.clone(),
        }
    }

    /// Returns a copy with a different resource.
    pub fn resource(&self, resource: impl Into<String>) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            resource: resource.into(),
        }
    }

    /// Binds the handle to the default transport.
    pub fn to(&self) -> ScopedTransport {
        self.to_transport(default_transport().clone())
    }

    /// Binds the handle to `transport`.
    pub fn to_transport(&self, transport: Transport) -> ScopedTransport {
        ScopedTransport {
            transport,
            endpoint: self.endpoint.clone(),
            resource: self.resource.clone(),
        }
    }
}

/// A transport whose requests start with an endpoint and resource already set.
#[derive(Debug, Clone)]
pub struct ScopedTransport {
    transport: Transport,
    endpoint: String,
    resource: String,
}

impl ScopedTransport {
    /// The underlying transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Returns a copy whose transport uses `encoder`.
    pub fn with_encoder(&self, encoder: impl RequestEncoder + 'static) -> Self {
        self.rebind(self.transport.with_encoder(encoder))
    }

    /// Returns a copy whose transport uses `round_tripper`.
    pub fn with_round_tripper(&self, round_tripper: impl RoundTripper + 'static) -> Self {
        self.rebind(self.transport.with_round_tripper(round_tripper))
    }

    /// Returns a copy whose transport uses `decoder`.
    pub fn with_decoder(&self, decoder: impl ResponseDecoder + 'static) -> Self {
        self.rebind(self.transport.with_decoder(decoder))
    }

    fn rebind(&self, transport: Transport) -> Self {
        Self {
            transport,
            endpoint: self.endpoint.clone(),
            resource: self.resource.clone(),
        }
    }

    /// Starts a request with the given method.
    ///
    /// An empty resource is left unset so the request can still choose one.
    pub fn method(&self, method: Method) -> RequestBuilder {
        let request = self.transport.method(method).endpoint(&self.endpoint);
        if self.resource.is_empty() {
            request
        } else {
            request.resource(self.resource.as_str())
        }
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
