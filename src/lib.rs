//! # restcall - A fluent REST request builder
//!
//! restcall builds REST calls one piece at a time (endpoint, path prefix,
//! resource, name, subresource, query, headers, body), runs them through a
//! pluggable transport with caller-controlled retries, and decodes the JSON
//! response into your own types. It is built on top of `reqwest`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restcall::{retry::RetryOnRetryable, Context, Transport};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//!     email: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restcall::Error> {
//!     let transport = Transport::builder()
//!         .timeout(Duration::from_secs(30))
//!         .build()?;
//!     let ctx = Context::background();
//!
//!     // GET https://api.example.com/v1/users/123
//!     let user: Option<User> = transport
//!         .get()
//!         .endpoint("https://api.example.com")
//!         .prefix(["v1"])
//!         .resource("users")
//!         .name("123")
//!         .retry_attempts(3, Duration::from_millis(100), RetryOnRetryable)
//!         .call(&ctx, &[])
//!         .await?;
//!     if let Some(user) = user {
//!         println!("User: {}", user.name);
//!     }
//!
//!     // POST a JSON body and accept 201 Created
//!     let created: Option<User> = transport
//!         .post()
//!         .endpoint("https://api.example.com")
//!         .prefix(["v1"])
//!         .resource("users")
//!         .json(&CreateUser {
//!             name: "Alice".to_string(),
//!             email: "alice@example.com".to_string(),
//!         })
//!         .call(&ctx, &[restcall::decoder::expect_status(http::StatusCode::CREATED)])
//!         .await?;
//!     println!("Created user with ID: {:?}", created.map(|u| u.id));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Fluent builder** - Chain URL parts, queries, headers and bodies; mistakes are collected and reported together
//! - **Validated path segments** - Resource names may not be `.`/`..` or contain `/` or `%`
//! - **Pluggable transport** - Swap the request encoder, round-tripper or response decoder independently
//! - **Caller-controlled retries** - Exponential, linear or custom strategies gated by a retry predicate
//! - **Cancellation** - Every call races a [`Context`] carrying a cancellation token and deadline
//! - **Lossless JSON** - Large integers survive decoding untouched
//! - **Automatic logging** - Structured logging with `tracing`
//!
//! ## Error Handling
//!
//! Configuration mistakes are reported at the terminal call, before any
//! network traffic. Failed responses keep their raw body:
//!
//! ```no_run
//! use restcall::{Context, Error, Transport};
//!
//! # async fn example() -> Result<(), Error> {
//! let result = Transport::new()
//!     .get()
//!     .endpoint("https://api.example.com")
//!     .resource("widgets")
//!     .call::<serde_json::Value>(&Context::background(), &[])
//!     .await;
//!
//! match result {
//!     Ok(widgets) => println!("Success: {:?}", widgets),
//!     Err(Error::Configuration(errors)) => eprintln!("Bad request setup: {}", errors),
//!     Err(Error::Upstream { code, message, .. }) => eprintln!("{}: {}", code, message),
//!     Err(Error::HttpError { status, raw_response, .. }) => {
//!         eprintln!("HTTP error {}: {}", status, raw_response);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod body;
pub mod context;
pub mod decoder;
pub mod encoder;
mod error;
mod path;
mod request;
pub mod resource;
mod response;
pub mod retry;
pub mod segment;
mod transport;

pub use body::{BodyReader, RequestBody};
pub use context::Context;
pub use decoder::{ResponseHook, Sink};
pub use error::{ConfigError, ConfigErrors, Error, Result};
pub use request::RequestBuilder;
pub use resource::{ResourceHandle, ScopedTransport};
pub use response::{Response, ResponseStream};
pub use retry::{RetryPolicy, RetryPredicate, RetryStrategy};
pub use transport::{default_transport, method, RoundTripper, Transport, TransportBuilder};
