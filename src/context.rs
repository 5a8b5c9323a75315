//! Per-call cancellation and deadlines.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bounds a single terminal call.
///
/// A context can carry a [`CancellationToken`], a deadline, both, or neither.
/// The round trip and every retry delay race against it, so cancelling the
/// token or passing the deadline ends the call promptly with
/// [`Error::Canceled`] or [`Error::Timeout`].
///
/// # Examples
///
/// ```no_run
/// use restcall::{Context, Transport};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), restcall::Error> {
/// let token = CancellationToken::new();
/// let ctx = Context::with_cancellation(token.clone()).with_timeout(Duration::from_secs(5));
///
/// let raw = Transport::new()
///     .get()
///     .endpoint("https://api.example.com")
///     .resource("widgets")
///     .bytes(&ctx)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context cancelled together with `token`.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            token: Some(token),
            deadline: None,
        }
    }

    /// Adds a deadline `timeout` from now, keeping an earlier one if present.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Adds a deadline, keeping an earlier one if present.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason this context is done, or `None` while it is live.
    pub fn err(&self) -> Option<Error> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(Error::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Error::Timeout),
            _ => None,
        }
    }

    /// Fails fast if the context is already done.
    pub fn check(&self) -> Result<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> Error {
        match (&self.token, self.deadline) {
            (Some(token), Some(deadline)) => {
                tokio::select! {
                    _ = token.cancelled() => Error::Canceled,
                    _ = tokio::time::sleep_until(deadline) => Error::Timeout,
                }
            }
            (Some(token), None) => {
                token.cancelled().await;
                Error::Canceled
            }
            (None, Some(deadline)) => {
                tokio::time::sleep_until(deadline).await;
                Error::Timeout
            }
            (None, None) => std::future::pending().await,
        }
    }

    /// Runs `future` until it completes or the context is done.
    pub async fn run<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            result = future => result,
        }
    }

    /// Sleeps for `delay`, waking early with an error if the context ends.
    pub async fn sleep(&self, delay: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        assert_eq!(ctx.run(async { Ok(5) }).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let token = CancellationToken::new();
        let ctx = Context::with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let started = std::time::Instant::now();
        let result = ctx.sleep(Duration::from_secs(30)).await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(Error::Canceled)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(ctx.check(), Err(Error::Canceled)));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_sleep() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));

        let result = ctx.sleep(Duration::from_secs(30)).await;

        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = Context::background()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(60));

        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
