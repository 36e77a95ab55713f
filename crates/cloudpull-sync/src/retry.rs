//! Bounded retry with exponential backoff
//!
//! Every call the engine makes against the remote store goes through a
//! [`RetryPolicy`]. A failed attempt is retried only when the caller's
//! classifier marks the error transient and attempts remain; the delay
//! before retry `n` (1-based) is `min(initial * multiplier^(n-1), max)`,
//! optionally scaled by a uniform jitter factor in `[0.5, 1.0]`. A
//! server-provided delay hint replaces the computed delay when it is longer.
//!
//! Two failure shapes reach the caller: [`RetryError::Permanent`] when the
//! classifier refused to retry, and [`RetryError::Exhausted`] when the
//! attempt budget ran out on a transient error.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use cloudpull_core::config::RetryConfig;
use cloudpull_core::ports::StoreError;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, error, info, warn};

// ============================================================================
// Backoff schedule
// ============================================================================

/// Delay schedule between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay before the first retry
    pub initial: Duration,
    /// Upper bound for a computed delay
    pub max: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Scale each delay by a random factor in `[0.5, 1.0]`
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl Backoff {
    /// A schedule that never waits
    pub fn none() -> Self {
        Self {
            initial: Duration::ZERO,
            max: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Deterministic delay before retry `retry` (1-based), without jitter
    pub fn nominal_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max.as_secs_f64()).max(0.0);
        Duration::try_from_secs_f64(capped).unwrap_or(self.max)
    }

    /// Delay actually slept before retry `retry`, honoring a store hint
    pub fn delay(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let mut delay = self.nominal_delay(retry);
        if self.jitter {
            let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
            delay = delay.mul_f64(factor);
        }
        match hint {
            Some(hint) if hint > delay => hint,
            _ => delay,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Terminal failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The error was classified as permanent; no retry was attempted
    #[error("{0}")]
    Permanent(#[source] E),

    /// Every attempt failed with a transient error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },
}

impl<E> RetryError<E> {
    /// The error of the last attempt
    pub fn into_inner(self) -> E {
        match self {
            Self::Permanent(err) | Self::Exhausted { last: err, .. } => err,
        }
    }

    /// The error of the last attempt, by reference
    pub fn last_error(&self) -> &E {
        match self {
            Self::Permanent(err) | Self::Exhausted { last: err, .. } => err,
        }
    }

    /// Returns true if the attempt budget ran out
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Retry policy applied uniformly to store calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 0 behaves like 1
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::default(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Backoff {
                initial: Duration::from_millis(config.initial_backoff_ms),
                max: Duration::from_millis(config.max_backoff_ms),
                multiplier: config.multiplier,
                jitter: config.jitter,
            },
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Attempt budget with the 0 => 1 normalization applied
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Runs `op` until it succeeds, fails permanently, or the budget runs out
    ///
    /// `is_transient` decides whether a failure is worth another attempt.
    pub async fn execute<T, E, F, Fut, C>(
        &self,
        operation_name: &str,
        op: F,
        is_transient: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
        E: Display,
    {
        self.run(operation_name, op, |err: &E| Classified {
            transient: is_transient(err),
            class: if is_transient(err) { "transient" } else { "permanent" },
            retry_after: None,
        })
        .await
    }

    /// [`execute`](Self::execute) specialised for store calls
    ///
    /// Classification comes from [`StoreError::is_transient`], and a rate
    /// limit's `retry_after` hint feeds the backoff.
    pub async fn execute_store<T, F, Fut>(
        &self,
        operation_name: &str,
        op: F,
    ) -> Result<T, RetryError<StoreError>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        self.run(operation_name, op, |err: &StoreError| Classified {
            transient: err.is_transient(),
            class: err.class(),
            retry_after: err.retry_after(),
        })
        .await
    }

    async fn run<T, E, F, Fut, C>(
        &self,
        operation_name: &str,
        mut op: F,
        classify: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> Classified,
        E: Display,
    {
        let max_attempts = self.effective_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    debug!(operation = operation_name, attempt, "Attempt succeeded");
                    if attempt > 1 {
                        info!(
                            operation = operation_name,
                            attempt, "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let classified = classify(&err);

                    if !classified.transient {
                        error!(
                            operation = operation_name,
                            attempt,
                            error_class = classified.class,
                            error = %err,
                            "Permanent error, not retrying"
                        );
                        return Err(RetryError::Permanent(err));
                    }

                    if attempt >= max_attempts {
                        error!(
                            operation = operation_name,
                            attempt,
                            max_attempts,
                            error_class = classified.class,
                            error = %err,
                            "Retry budget exhausted"
                        );
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }

                    let delay = self.backoff.delay(attempt, classified.retry_after);
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        error_class = classified.class,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Classification of one failed attempt
struct Classified {
    transient: bool,
    class: &'static str,
    retry_after: Option<Duration>,
}
