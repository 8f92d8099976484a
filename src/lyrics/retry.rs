//! Retry decorator for lyrics sources.
//!
//! Implements capped exponential backoff with full jitter. The backoff wait is
//! raced against the request context so a cancelled caller never sits out a
//! sleep.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use super::source::{LyricsSource, RawLyricsRecord, SourceError};
use crate::context::RequestContext;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt, so at most `max_retries + 1` calls.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Ceiling for the exponential growth, applied before jitter.
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// `initial_backoff * multiplier^attempt`, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let nanos = self.initial_backoff.as_nanos() as f64 * self.multiplier.powi(exp);
        let capped = nanos.min(self.max_backoff.as_nanos() as f64);
        if capped.is_nan() || capped <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(capped as u64)
    }

    /// Full jitter: a uniform draw from `[0, backoff(attempt))`.
    ///
    /// A backoff that truncates to zero falls back to `initial_backoff`.
    pub fn jittered_backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let nanos = self.backoff(attempt).as_nanos();
        let Ok(nanos) = u64::try_from(nanos) else {
            return self.max_backoff;
        };
        if nanos == 0 {
            return self.initial_backoff;
        }
        Duration::from_nanos(rng.random_range(0..nanos))
    }
}

/// Wraps a [`LyricsSource`] and retries transient failures per a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: LyricsSource> RetryingSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: LyricsSource> LyricsSource for RetryingSource<S> {
    async fn get_lyrics(
        &self,
        ctx: &RequestContext,
        track: &str,
        artist: &str,
    ) -> Result<RawLyricsRecord, SourceError> {
        let mut attempt: u32 = 0;
        loop {
            let err = match self.inner.get_lyrics(ctx, track, artist).await {
                Ok(record) => return Ok(record),
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!(attempt, error = %err, "lyrics fetch failed, not retryable");
                return Err(err);
            }
            if attempt >= self.policy.max_retries {
                warn!(
                    attempts = attempt + 1,
                    error = %err,
                    "lyrics fetch failed, retries exhausted"
                );
                return Err(err);
            }

            let delay = self.policy.jittered_backoff(attempt, &mut rand::rng());
            warn!(
                attempt = attempt + 1,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "lyrics fetch failed, retrying"
            );

            tokio::select! {
                biased;
                reason = ctx.done() => {
                    debug!(attempt, %reason, "retry backoff interrupted");
                    return Err(SourceError::Context(reason));
                }
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
