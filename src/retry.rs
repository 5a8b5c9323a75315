//! Retry strategies, predicates and the retry loop.
//!
//! A [`RetryPolicy`] pairs a [`RetryStrategy`] (how long to wait before the
//! next attempt, and when attempts run out) with a [`RetryPredicate`] (whether
//! a given outcome deserves another attempt at all). The predicate sees the
//! raw round-trip outcome, so it can retry on transport errors as well as on
//! any status code.

use crate::{context::Context, transport::RoundTripper, Error, Result};
use http::StatusCode;
use http_body_util::BodyExt;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Defines how long to wait between attempts and when to give up.
///
/// # Examples
///
/// ```
/// use restcall::RetryStrategy;
/// use std::time::Duration;
///
/// // No retries
/// let no_retry = RetryStrategy::None;
///
/// // Exponential backoff: 100ms, 200ms, 400ms, 800ms...
/// let exponential = RetryStrategy::ExponentialBackoff {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(30),
///     max_retries: 5,
///     jitter: true,
/// };
///
/// // Linear backoff: 1s, 1s, 1s...
/// let linear = RetryStrategy::Linear {
///     delay: Duration::from_secs(1),
///     max_retries: 3,
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub enum RetryStrategy {
    /// Do not retry failed requests.
    #[default]
    None,

    /// Retry with exponentially increasing delays.
    ///
    /// Each retry waits for `initial_delay * 2^(retry - 1)` (capped at `max_delay`).
    /// Optional jitter adds randomness to prevent thundering herd.
    ExponentialBackoff {
        /// The initial delay before the first retry.
        initial_delay: Duration,
        /// The maximum delay between retries.
        max_delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
        /// Whether to add random jitter to delays (recommended).
        jitter: bool,
    },

    /// Retry with a fixed delay between attempts.
    Linear {
        /// The delay between retry attempts.
        delay: Duration,
        /// The maximum number of retry attempts.
        max_retries: usize,
    },

    /// Custom retry logic.
    ///
    /// Provide a function that takes the attempt number (starting from 1)
    /// and returns `Some(delay)` to retry after the delay, or `None` to stop.
    Custom {
        /// Function that determines retry delay.
        delay_fn: fn(attempt: usize) -> Option<Duration>,
    },
}

impl RetryStrategy {
    /// Builds the strategy for "`attempts` executions in total, starting at
    /// `interval`".
    ///
    /// Delays grow from `interval` towards `2 * interval`. A zero interval
    /// retries immediately.
    pub fn attempts(attempts: usize, interval: Duration) -> Self {
        let max_retries = attempts.saturating_sub(1);
        if max_retries == 0 {
            RetryStrategy::None
        } else if interval.is_zero() {
            RetryStrategy::Linear {
                delay: Duration::ZERO,
                max_retries,
            }
        } else {
            RetryStrategy::ExponentialBackoff {
                initial_delay: interval,
                max_delay: interval.saturating_mul(2),
                max_retries,
                jitter: true,
            }
        }
    }

    /// Returns the delay after the given failed attempt, or `None` if retries are exhausted.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt that just finished (1-indexed, so 1 = the initial request)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_retries,
                jitter,
            } => {
                if attempt > *max_retries {
                    return None;
                }

                // initial_delay * 2^(attempt - 1)
                let multiplier = 2u64.saturating_pow(attempt.saturating_sub(1) as u32);
                let base_delay =
                    initial_delay.saturating_mul(multiplier.try_into().unwrap_or(u32::MAX));
                let delay = base_delay.min(*max_delay);

                if *jitter {
                    // between 50% and 100% of the delay
                    let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(jitter_factor))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay, max_retries } => {
                if attempt > *max_retries {
                    None
                } else {
                    Some(*delay)
                }
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }

    /// Returns the maximum number of retries, if applicable.
    pub fn max_retries(&self) -> Option<usize> {
        match self {
            RetryStrategy::None => Some(0),
            RetryStrategy::ExponentialBackoff { max_retries, .. } => Some(*max_retries),
            RetryStrategy::Linear { max_retries, .. } => Some(*max_retries),
            RetryStrategy::Custom { .. } => None,
        }
    }
}

/// Decides whether an attempt's outcome warrants another attempt.
///
/// The predicate is authoritative: returning `false` stops the loop even if
/// the strategy still has retries left.
///
/// Any `Fn(&Result<reqwest::Response>) -> bool` closure is a predicate.
///
/// # Examples
///
/// ```
/// use restcall::{Error, RetryPredicate};
///
/// struct RetryOnRateLimit;
///
/// impl RetryPredicate for RetryOnRateLimit {
///     fn should_retry(&self, outcome: &Result<reqwest::Response, Error>) -> bool {
///         matches!(outcome, Ok(response) if response.status().as_u16() == 429)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Returns `true` to try again.
    fn should_retry(&self, outcome: &Result<reqwest::Response>) -> bool;
}

impl<F> RetryPredicate for F
where
    F: Fn(&Result<reqwest::Response>) -> bool + Send + Sync,
{
    fn should_retry(&self, outcome: &Result<reqwest::Response>) -> bool {
        self(outcome)
    }
}

/// Retry network errors, timeouts, 5xx and 429 responses.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRetryable;

impl RetryPredicate for RetryOnRetryable {
    fn should_retry(&self, outcome: &Result<reqwest::Response>) -> bool {
        match outcome {
            Ok(response) => {
                let status = response.status();
                status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
            }
            Err(error) => error.is_retryable(),
        }
    }
}

/// Retry only on 5xx server errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOn5xx;

impl RetryPredicate for RetryOn5xx {
    fn should_retry(&self, outcome: &Result<reqwest::Response>) -> bool {
        matches!(outcome, Ok(response) if response.status().is_server_error())
    }
}

/// Retry only on timeout errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, outcome: &Result<reqwest::Response>) -> bool {
        matches!(outcome, Err(Error::Timeout))
    }
}

/// Retry only on network/connection errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnConnectionError;

impl RetryPredicate for RetryOnConnectionError {
    fn should_retry(&self, outcome: &Result<reqwest::Response>) -> bool {
        matches!(outcome, Err(Error::Network(_)))
    }
}

/// Retry on every outcome until the strategy runs out.
#[derive(Debug, Clone, Copy)]
pub struct RetryAlways;

impl RetryPredicate for RetryAlways {
    fn should_retry(&self, _outcome: &Result<reqwest::Response>) -> bool {
        true
    }
}

/// Combine multiple retry predicates with OR logic.
///
/// Retries if ANY of the predicates return `true`.
///
/// # Examples
///
/// ```
/// use restcall::retry::{RetryOn5xx, RetryOnTimeout, OrPredicate};
///
/// // Retry on 5xx errors OR timeouts
/// let predicate = OrPredicate::new(vec![
///     Box::new(RetryOn5xx),
///     Box::new(RetryOnTimeout),
/// ]);
/// ```
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    /// Creates a new `OrPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, outcome: &Result<reqwest::Response>) -> bool {
        self.predicates.iter().any(|p| p.should_retry(outcome))
    }
}

/// Combine multiple retry predicates with AND logic.
///
/// Retries only if ALL of the predicates return `true`.
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    /// Creates a new `AndPredicate` from a list of predicates.
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for AndPredicate {
    fn should_retry(&self, outcome: &Result<reqwest::Response>) -> bool {
        self.predicates.iter().all(|p| p.should_retry(outcome))
    }
}

/// Receives a notification before every retry delay.
pub trait RetryObserver: Send + Sync {
    /// Called after `attempt` failed and before waiting `delay`.
    fn on_retry(&self, attempt: usize, outcome: &Result<reqwest::Response>, delay: Duration);
}

/// The default observer. Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {
    fn on_retry(&self, _attempt: usize, _outcome: &Result<reqwest::Response>, _delay: Duration) {}
}

/// A strategy, a predicate and an observer: everything the retry loop needs.
///
/// Without a predicate the request is executed exactly once.
#[derive(Clone)]
pub struct RetryPolicy {
    strategy: RetryStrategy,
    predicate: Option<Arc<dyn RetryPredicate>>,
    observer: Arc<dyn RetryObserver>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::None,
            predicate: None,
            observer: Arc::new(NoopObserver),
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("strategy", &self.strategy)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// A policy that retries per `strategy` while `predicate` agrees.
    pub fn new(strategy: RetryStrategy, predicate: impl RetryPredicate + 'static) -> Self {
        Self {
            strategy,
            predicate: Some(Arc::new(predicate)),
            ..Self::default()
        }
    }

    /// Sets the observer notified before each retry.
    pub fn with_observer(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// The configured strategy.
    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    /// Returns `true` if this policy can ever issue a second attempt.
    pub fn may_retry(&self) -> bool {
        self.predicate.is_some() && self.strategy.max_retries() != Some(0)
    }

    /// Executes `request` through `transport`, retrying per this policy.
    ///
    /// Returns the final outcome and the number of attempts made. Retries stop
    /// as soon as `ctx` is cancelled or its deadline passes, including while
    /// waiting between attempts.
    pub async fn execute(
        &self,
        ctx: &Context,
        transport: &dyn RoundTripper,
        request: reqwest::Request,
    ) -> Result<(reqwest::Response, usize)> {
        ctx.check()?;

        let Some(predicate) = self.predicate.as_ref().filter(|_| self.may_retry()) else {
            tracing::debug!(
                method = %request.method(),
                url = %request.url(),
                attempt = 1,
                "Executing HTTP request"
            );
            let response = ctx.run(transport.round_trip(request)).await?;
            return Ok((response, 1));
        };

        let request = ctx.run(replayable(request)).await?;
        let started = Instant::now();
        let mut attempt = 1;

        loop {
            ctx.check()?;

            let attempt_request = request.try_clone().ok_or_else(|| {
                Error::InvalidRequest("request body cannot be replayed".to_string())
            })?;

            tracing::debug!(
                method = %request.method(),
                url = %request.url(),
                attempt = attempt,
                "Executing HTTP request"
            );

            let outcome = match ctx.run(transport.round_trip(attempt_request)).await {
                Err(err @ (Error::Canceled | Error::Timeout)) if ctx.err().is_some() => {
                    return Err(err)
                }
                outcome => outcome,
            };

            if !predicate.should_retry(&outcome) {
                return outcome.map(|response| (response, attempt));
            }

            let Some(delay) = self.strategy.delay_for_attempt(attempt) else {
                return outcome.map(|response| (response, attempt));
            };

            match &outcome {
                Ok(response) => tracing::warn!(
                    status = response.status().as_u16(),
                    attempt = attempt,
                    "Request attempt failed"
                ),
                Err(e) => tracing::warn!(error = %e, attempt = attempt, "Request attempt failed"),
            }
            tracing::info!(
                delay_ms = delay.as_millis(),
                attempt = attempt,
                elapsed_ms = started.elapsed().as_millis(),
                "Retrying request after delay"
            );
            self.observer.on_retry(attempt, &outcome, delay);
            drop(outcome);

            ctx.sleep(delay).await?;
            attempt += 1;
        }
    }
}

/// Buffers a streaming body so the request can be cloned for every attempt.
async fn replayable(mut request: reqwest::Request) -> Result<reqwest::Request> {
    let streaming = request
        .body()
        .is_some_and(|body| body.as_bytes().is_none());
    if !streaming {
        return Ok(request);
    }

    if let Some(body) = request.body_mut().take() {
        let buffered = body
            .collect()
            .await
            .map_err(Error::from_reqwest)?
            .to_bytes();
        *request.body_mut() = Some(reqwest::Body::from(buffered));
    }
    Ok(request)
}
