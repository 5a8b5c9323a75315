//! Example demonstrating comprehensive error handling.
//!
//! This example shows how to:
//! - Read accumulated configuration errors
//! - Handle upstream error envelopes and raw HTTP errors
//! - Deal with content-type and deserialization failures
//! - Bound a call with a deadline
//!
//! Run with: `cargo run --example error_handling`

use restcall::{Context, Error, Transport};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("restcall=info")
        .init();

    let transport = Transport::new();
    let ctx = Context::background();

    println!("=== Example 1: Configuration Errors ===");
    // Every mistake is reported at once, and nothing is sent
    let result = transport
        .get()
        .endpoint("https://jsonplaceholder.typicode.com")
        .resource("posts/1")
        .name("")
        .retry_attempts(0, Duration::ZERO, restcall::retry::RetryAlways)
        .call::<Post>(&ctx, &[])
        .await;
    if let Err(Error::Configuration(errors)) = result {
        for error in &errors {
            println!("  - {}", error);
        }
    }
    println!();

    println!("=== Example 2: Handling HTTP Errors ===");
    match transport
        .get()
        .endpoint("https://httpbin.org")
        .resource("status")
        .name("404")
        .call::<Post>(&ctx, &[])
        .await
    {
        Ok(post) => println!("Success: {:?}", post),
        Err(Error::Upstream { status, code, message, .. }) => {
            println!("Upstream error {} ({}): {}", status, code, message);
        }
        Err(Error::HttpError {
            status,
            raw_response,
            headers,
        }) => {
            println!("HTTP Error {}", status);
            println!("Raw response: {}", raw_response);
            println!("Content-Type: {:?}", headers.get("content-type"));
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 3: Content-Type Mismatch ===");
    match transport
        .get()
        .endpoint("https://httpbin.org")
        .resource("html")
        .call::<Post>(&ctx, &[])
        .await
    {
        Err(Error::UnsupportedContentType(media)) => println!("Refused to decode {}", media),
        other => println!("Unexpected: {:?}", other),
    }
    println!();

    println!("=== Example 4: Deserialization Errors ===");
    match transport
        .get()
        .endpoint("https://httpbin.org")
        .resource("json")
        .call::<Post>(&ctx, &[])
        .await
    {
        Err(Error::DeserializationFailed {
            raw_response,
            serde_error,
            status,
        }) => {
            println!("Status: {}", status);
            println!("Serde error: {}", serde_error);
            println!("Raw response (first 100 chars): {:.100}", raw_response);
        }
        other => println!("Unexpected: {:?}", other),
    }
    println!();

    println!("=== Example 5: Deadlines ===");
    let short = Context::background().with_timeout(Duration::from_millis(500));
    match transport
        .get()
        .endpoint("https://httpbin.org")
        .resource("delay")
        .name("5")
        .call_nop(&short, &[])
        .await
    {
        Err(e @ Error::Timeout) => println!("{} (retryable: {})", e, e.is_retryable()),
        other => println!("Unexpected: {:?}", other),
    }

    Ok(())
}
