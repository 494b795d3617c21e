// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! Manages graceful shutdown across pipeline components.
//!
//! ## Design Pattern
//!
//! The shutdown coordinator provides:
//! - **Cancellation tokens** for propagating shutdown signals
//! - **Child tokens** so a run can be cancelled without touching the
//!   process-wide token, while still observing it
//! - **Grace period** with timeout enforcement
//!
//! Workers hold a token clone and check it at suspension points; a
//! cancelled worker returns `Cancelled` and does not retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Default grace period for graceful shutdown (in seconds)
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

/// Cancellation token for signaling shutdown.
///
/// Lightweight, clonable, and safe to share across tasks. Checking is
/// lock-free; waiting is async. A child token observes its parent's
/// cancellation but cancelling the child leaves the parent untouched.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    parent: Option<Arc<CancellationToken>>,
}

impl CancellationToken {
    /// Creates a fresh token that nothing has cancelled yet
    pub fn unarmed() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            parent: None,
        }
    }

    /// Creates a child token: cancelled when either it or this token is
    /// cancelled, but cancelling the child does not cancel this token.
    pub fn child(&self) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Cancels this token and wakes all waiters
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Checks if this token or any ancestor is cancelled (non-blocking)
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Waits for cancellation (async)
    pub async fn cancelled(&self) {
        // Register interest before re-checking the flag so a cancel
        // between check and await cannot be missed.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return;
        }

        match &self.parent {
            None => notified.await,
            Some(parent) => {
                let parent_wait = Box::pin(parent.cancelled());
                tokio::select! {
                    _ = notified => {}
                    _ = parent_wait => {}
                }
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::unarmed()
    }
}

/// Shutdown coordinator.
///
/// Manages graceful shutdown with a grace period and timeout enforcement.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator
    ///
    /// # Arguments
    ///
    /// * `grace_period` - Maximum time to wait for graceful shutdown
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::unarmed(),
            grace_period,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Gets a cancellation token.
    ///
    /// Tokens can be cloned and passed to async tasks for shutdown
    /// signaling.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Checks if shutdown has been initiated
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Initiates graceful shutdown: sets the flag and cancels all tokens.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("Initiating graceful shutdown (grace period: {:?})", self.grace_period);
            self.token.cancel();
        }
    }

    /// Waits until either the given future completes or the grace period
    /// elapses.
    ///
    /// Returns `true` when the future finished inside the grace period.
    pub async fn wait_with_grace<F>(&self, fut: F) -> bool
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = fut => true,
            _ = tokio::time::sleep(self.grace_period) => false,
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_cancel_and_check() {
        let token = CancellationToken::unarmed();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        // Waiting on an already-cancelled token returns immediately.
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let token = CancellationToken::unarmed();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_observes_parent() {
        let parent = CancellationToken::unarmed();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
        child.cancelled().await;
    }

    #[tokio::test]
    async fn test_child_cancel_leaves_parent_untouched() {
        let parent = CancellationToken::unarmed();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_coordinator_cancels_tokens() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        let token = coordinator.token();
        assert!(!coordinator.is_shutting_down());
        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutting_down());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_with_grace_times_out() {
        let coordinator = ShutdownCoordinator::new(Duration::from_millis(10));
        let finished = coordinator
            .wait_with_grace(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
            })
            .await;
        assert!(!finished);
    }
}
