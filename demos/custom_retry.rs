//! Example demonstrating custom retry predicates.
//!
//! This example shows how to:
//! - Write retry predicates as types or closures
//! - Combine predicates with AND/OR logic
//! - Stop retrying as soon as a predicate says no
//!
//! Run with: `cargo run --example custom_retry`

use restcall::retry::{AndPredicate, OrPredicate, RetryOn5xx, RetryOnTimeout};
use restcall::{Context, Error, RetryPredicate, RetryStrategy, Transport};
use std::time::Duration;

/// Custom predicate: Retry on rate limit responses (HTTP 429)
struct RetryOnRateLimit;

impl RetryPredicate for RetryOnRateLimit {
    fn should_retry(&self, outcome: &restcall::Result<reqwest::Response>) -> bool {
        matches!(outcome, Ok(response) if response.status().as_u16() == 429)
    }
}

/// Custom predicate: Retry only while the server asks us to
struct RetryWhenAdvised;

impl RetryPredicate for RetryWhenAdvised {
    fn should_retry(&self, outcome: &restcall::Result<reqwest::Response>) -> bool {
        matches!(outcome, Ok(response) if response.headers().contains_key("retry-after"))
    }
}

const ENDPOINT: &str = "https://httpbin.org";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restcall=info,custom_retry=info")
        .init();

    let transport = Transport::new();
    let ctx = Context::background();
    let strategy = RetryStrategy::ExponentialBackoff {
        initial_delay: Duration::from_millis(200),
        max_delay: Duration::from_secs(2),
        max_retries: 3,
        jitter: true,
    };

    println!("=== Example 1: Retry on Rate Limits ===");
    let result = transport
        .get()
        .endpoint(ENDPOINT)
        .resource("status")
        .name("429")
        .retry(strategy.clone(), RetryOnRateLimit)
        .call_nop(&ctx, &[])
        .await;
    println!("Result: {:?}\n", result.err());

    println!("=== Example 2: 5xx OR timeout ===");
    let predicate = OrPredicate::new(vec![Box::new(RetryOn5xx), Box::new(RetryOnTimeout)]);
    let result = transport
        .get()
        .endpoint(ENDPOINT)
        .resource("status")
        .name("503")
        .retry(strategy.clone(), predicate)
        .call_nop(&ctx, &[])
        .await;
    println!("Result: {:?}\n", result.err());

    println!("=== Example 3: 5xx AND Retry-After ===");
    let predicate = AndPredicate::new(vec![Box::new(RetryOn5xx), Box::new(RetryWhenAdvised)]);
    let result = transport
        .get()
        .endpoint(ENDPOINT)
        .resource("status")
        .name("500")
        .retry(strategy.clone(), predicate)
        .call_nop(&ctx, &[])
        .await;
    println!("Result (no Retry-After, so a single attempt): {:?}\n", result.err());

    println!("=== Example 4: Closure predicate with a fixed attempt budget ===");
    let result = transport
        .get()
        .endpoint(ENDPOINT)
        .resource("status")
        .name("502")
        .retry_attempts(
            4,
            Duration::from_millis(100),
            |outcome: &restcall::Result<reqwest::Response>| match outcome {
                Ok(response) => response.status() == http::StatusCode::BAD_GATEWAY,
                Err(e) => e.is_retryable(),
            },
        )
        .call_nop(&ctx, &[])
        .await;
    println!("Result after 4 attempts: {:?}", result.err());

    Ok(())
}
