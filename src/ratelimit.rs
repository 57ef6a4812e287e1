//! # Rate Limiting and Retry
//!
//! Client-side pacing for model calls, plus the policy applied when the
//! provider answers with a rate-limit signal anyway.
//!
//! ## Key Components
//!
//! - `RateLimiter`: keeps consecutive calls at least `min_interval` apart,
//!   measured from the end of the last successful call
//! - `RetryPolicy`: how many times, and after what delay, a rate-limited call
//!   is retried
//! - `min_request_interval`: derives the interval from a tokens-per-minute
//!   budget and a per-call token ceiling
//!
//! The default retry policy never gives up: a provider that keeps returning
//! rate-limit errors keeps the caller waiting forever. Use
//! `RetryPolicy::bounded` where that is not acceptable.
//!
//! A limiter assumes one pipeline run at a time. Sharing one between
//! concurrent runs keeps each call paced against the last recorded call, but
//! does not queue waiters fairly.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{Error, Result};

/// Delay between rate-limit retries when none is configured
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Cap on a single exponential backoff delay
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(15 * 60);

/// Minimum spacing of calls so that `max_tokens_per_call`-sized calls stay
/// within `tokens_per_minute`: `ceil(60 / (tokens_per_minute / max_tokens_per_call))`
/// seconds.
///
/// Returns `None` when either argument is zero.
pub fn min_request_interval(tokens_per_minute: u32, max_tokens_per_call: u32) -> Option<Duration> {
    if tokens_per_minute == 0 || max_tokens_per_call == 0 {
        return None;
    }

    let calls_per_minute = f64::from(tokens_per_minute) / f64::from(max_tokens_per_call);
    let seconds = (60.0 / calls_per_minute).ceil();
    Some(Duration::from_secs(seconds as u64))
}

/// Enforces a minimum gap between consecutive requests
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with an explicit interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Create a limiter from a tokens-per-minute budget and per-call ceiling
    pub fn from_token_budget(tokens_per_minute: u32, max_tokens_per_call: u32) -> Result<Self> {
        min_request_interval(tokens_per_minute, max_tokens_per_call)
            .map(Self::new)
            .ok_or_else(|| {
                Error::Config(format!(
                    "cannot derive a request interval from {} tokens per minute and {} tokens per call",
                    tokens_per_minute, max_tokens_per_call
                ))
            })
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The enforced gap between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// When the last request was recorded, if ever
    pub async fn last_request(&self) -> Option<Instant> {
        *self.last_request.lock().await
    }

    /// Wait until `min_interval` has passed since the last recorded request
    pub async fn until_ready(&self) {
        let wait = {
            let last_request = self.last_request.lock().await;
            last_request.and_then(|at| self.min_interval.checked_sub(at.elapsed()))
        };

        if let Some(wait) = wait.filter(|w| !w.is_zero()) {
            debug!(
                wait_ms = wait.as_millis(),
                "Rate limiter waiting before next request"
            );
            sleep(wait).await;
        }
    }

    /// Stamp the current time as the last request
    pub async fn record_request(&self) {
        *self.last_request.lock().await = Some(Instant::now());
    }
}

/// Delay schedule between retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay before every retry
    Fixed(Duration),

    /// `base * 2^(retry - 1)`, capped at `max`
    Exponential {
        /// Delay before the first retry
        base: Duration,
        /// Upper bound on any delay
        max: Duration,
    },
}

impl Backoff {
    /// Delay before the given retry (1 for the first retry)
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

/// What to do when the provider signals a rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retries per call; `None` retries forever
    pub max_retries: Option<u32>,

    /// Delay schedule
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Backoff::Fixed(DEFAULT_RETRY_DELAY))
    }
}

impl RetryPolicy {
    /// Retry for as long as the provider keeps rate limiting
    pub fn unbounded(backoff: Backoff) -> Self {
        Self {
            max_retries: None,
            backoff,
        }
    }

    /// Retry at most `max_retries` times
    pub fn bounded(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries: Some(max_retries),
            backoff,
        }
    }

    /// Whether another retry is allowed after `retries_so_far` retries
    pub fn allows_retry(&self, retries_so_far: u32) -> bool {
        self.max_retries.is_none_or(|max| retries_so_far < max)
    }

    /// Delay before the given retry (1 for the first retry)
    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff.delay(retry)
    }
}
