//! Example demonstrating different retry strategies.
//!
//! This example shows how to:
//! - Configure exponential backoff, linear and custom strategies
//! - Watch retries with a `RetryObserver`
//! - Cancel a call while it waits between attempts
//!
//! Run with: `cargo run --example retry_strategies`

use restcall::retry::{RetryObserver, RetryOnRetryable};
use restcall::{Context, Error, RetryPolicy, RetryStrategy, Transport};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct PrintObserver;

impl RetryObserver for PrintObserver {
    fn on_retry(&self, attempt: usize, outcome: &restcall::Result<reqwest::Response>, delay: Duration) {
        let what = match outcome {
            Ok(response) => response.status().to_string(),
            Err(e) => e.to_string(),
        };
        println!("  attempt {} failed with {}, retrying in {:?}", attempt, what, delay);
    }
}

fn custom_delays(attempt: usize) -> Option<Duration> {
    match attempt {
        1 => Some(Duration::from_millis(50)),
        2 => Some(Duration::from_millis(250)),
        _ => None,
    }
}

const ENDPOINT: &str = "https://httpbin.org";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restcall=info,retry_strategies=info")
        .init();

    let transport = Transport::new();
    let ctx = Context::background();

    let strategies = [
        (
            "Exponential backoff (100ms, 200ms, 400ms with jitter)",
            RetryStrategy::ExponentialBackoff {
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(30),
                max_retries: 3,
                jitter: true,
            },
        ),
        (
            "Linear (fixed 300ms)",
            RetryStrategy::Linear {
                delay: Duration::from_millis(300),
                max_retries: 2,
            },
        ),
        (
            "Custom (50ms, then 250ms)",
            RetryStrategy::Custom {
                delay_fn: custom_delays,
            },
        ),
    ];

    for (label, strategy) in strategies {
        println!("=== {} ===", label);
        let policy = RetryPolicy::new(strategy, RetryOnRetryable).with_observer(PrintObserver);
        let start = std::time::Instant::now();
        let result = transport
            .get()
            .endpoint(ENDPOINT)
            .resource("status")
            .name("503")
            .retry_policy(policy)
            .call_nop(&ctx, &[])
            .await;
        println!("  finished with {:?} after {:?}\n", result.err(), start.elapsed());
    }

    println!("=== Cancel while waiting ===");
    let token = CancellationToken::new();
    let cancellable = Context::with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let result = transport
        .get()
        .endpoint(ENDPOINT)
        .resource("status")
        .name("503")
        .retry(
            RetryStrategy::Linear {
                delay: Duration::from_secs(60),
                max_retries: 5,
            },
            RetryOnRetryable,
        )
        .call_nop(&cancellable, &[])
        .await;
    println!("  result: {:?}", result.err());

    Ok(())
}
