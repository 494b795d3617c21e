// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bounded Retry with Backoff
//!
//! Wraps a store call with the retry discipline: admission through the
//! endpoint's circuit breaker, bounded attempts, exponential backoff with
//! jitter, and cancellation between attempts. Only transient errors
//! (timeouts, rate limits, network failures) are retried; everything else
//! surfaces on the first attempt.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use secret_sync_bootstrap::shutdown::CancellationToken;
use secret_sync_domain::SyncError;

use super::circuit_breaker::CircuitBreaker;

/// Retry bounds and backoff shape.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first included
    pub max_attempts: u32,

    /// Delay before the first retry; doubles each attempt
    pub base_delay: Duration,

    /// Ceiling on any single delay
    pub max_delay: Duration,

    /// Fractional jitter applied to each delay (`0.25` = ±25%)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Computes the jittered delay before retry number `attempt` (1-based)
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_millis() as f64 * 2f64.powi(attempt.saturating_sub(1) as i32);
        let capped = exp.min(self.max_delay.as_millis() as f64);
        let spread = capped * self.jitter;
        let jittered = capped + rand::rng().random_range(-spread..=spread);
        Duration::from_millis(jittered.max(0.0) as u64)
    }
}

/// A completed retry loop: the final result plus the retries consumed.
pub struct RetryOutcome<T> {
    pub result: Result<T, SyncError>,
    pub retries: u32,
}

/// Runs `operation` under the breaker and retry policy.
///
/// The breaker is consulted once per attempt; breaker rejection
/// (`CircuitOpen`) is never retried. Cancellation between attempts
/// returns `Cancelled`.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    op_name: &str,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let mut retries = 0;

    loop {
        if cancel.is_cancelled() {
            return RetryOutcome {
                result: Err(SyncError::cancelled()),
                retries,
            };
        }

        if let Err(open) = breaker.admit() {
            return RetryOutcome {
                result: Err(open),
                retries,
            };
        }

        match operation().await {
            Ok(value) => {
                breaker.record_success();
                return RetryOutcome {
                    result: Ok(value),
                    retries,
                };
            }
            Err(error) if error.is_transient() => {
                breaker.record_failure();
                if retries + 1 >= policy.max_attempts {
                    return RetryOutcome {
                        result: Err(error),
                        retries,
                    };
                }
                retries += 1;
                let delay = policy.delay_for(retries);
                debug!(operation = op_name, retry = retries, ?delay, error = %error, "retrying after transient failure");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        return RetryOutcome {
                            result: Err(SyncError::cancelled()),
                            retries,
                        };
                    }
                }
            }
            Err(error) => {
                // Non-transient failures surface immediately and do not
                // count toward tripping the endpoint's breaker.
                return RetryOutcome {
                    result: Err(error),
                    retries,
                };
            }
        }
    }
}
