// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Circuit Breaker
//!
//! Per-endpoint three-state breaker guarding external dependencies:
//!
//! - **closed** - calls pass through; consecutive failures are counted
//! - **open** - calls fast-fail with `CircuitOpen` until the cool-down
//!   elapses
//! - **half-open** - one probe is allowed; success closes the breaker,
//!   failure re-opens it
//!
//! State transitions are logged. Failure counts are per endpoint: each
//! external dependency (source store, target store, discovery service)
//! carries its own breaker, obtained from a shared [`BreakerSet`].

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use secret_sync_domain::SyncError;

/// Consecutive failures that trip a closed breaker
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default cool-down before a tripped breaker allows a probe
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Three-state circuit breaker for one endpoint.
pub struct CircuitBreaker {
    endpoint: String,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a breaker with default thresholds
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_settings(endpoint, DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }

    /// Creates a breaker with explicit threshold and cool-down
    pub fn with_settings(endpoint: impl Into<String>, failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            failure_threshold: failure_threshold.max(1),
            cooldown,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Admission check before a call.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::CircuitOpen`] while the breaker is open and
    /// the cool-down has not elapsed. When it has, the breaker moves to
    /// half-open and admits exactly this caller as the probe.
    pub fn admit(&self) -> Result<(), SyncError> {
        let mut inner = self.inner.lock();
        match inner.state {
            State::Closed => Ok(()),
            State::HalfOpen => Err(SyncError::CircuitOpen(format!(
                "endpoint {:?} is half-open with a probe in flight",
                self.endpoint
            ))),
            State::Open => {
                let elapsed = inner.opened_at.map(|at| at.elapsed()).unwrap_or_default();
                if elapsed >= self.cooldown {
                    inner.state = State::HalfOpen;
                    info!(endpoint = %self.endpoint, "circuit half-open, admitting probe");
                    Ok(())
                } else {
                    Err(SyncError::CircuitOpen(format!(
                        "endpoint {:?} cooling down for {:?} more",
                        self.endpoint,
                        self.cooldown.saturating_sub(elapsed)
                    )))
                }
            }
        }
    }

    /// Records a successful call: closes the breaker and resets counts.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != State::Closed {
            info!(endpoint = %self.endpoint, "circuit closed");
        }
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    /// Records a failed call: a half-open probe failure re-opens the
    /// breaker immediately, a closed breaker opens at the threshold.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
                warn!(endpoint = %self.endpoint, "probe failed, circuit re-opened");
            }
            State::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!(
                        endpoint = %self.endpoint,
                        failures = inner.consecutive_failures,
                        "failure threshold reached, circuit opened"
                    );
                }
            }
            State::Open => {}
        }
    }
}

/// Shared registry of breakers, one per endpoint name.
#[derive(Default)]
pub struct BreakerSet {
    failure_threshold: Option<u32>,
    cooldown: Option<Duration>,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides breaker settings for every endpoint in this set
    pub fn with_settings(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: Some(failure_threshold),
            cooldown: Some(cooldown),
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the breaker for an endpoint, creating it on first use.
    pub fn breaker(&self, endpoint: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.read().get(endpoint) {
            return Arc::clone(existing);
        }

        let mut breakers = self.breakers.write();
        Arc::clone(breakers.entry(endpoint.to_string()).or_insert_with(|| {
            Arc::new(CircuitBreaker::with_settings(
                endpoint,
                self.failure_threshold.unwrap_or(DEFAULT_FAILURE_THRESHOLD),
                self.cooldown.unwrap_or(DEFAULT_COOLDOWN),
            ))
        }))
    }
}
