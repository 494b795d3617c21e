// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Supervision
//!
//! Supervised execution of per-target workers. A worker future resolves
//! to `Some(outcome)` when its operation ran, or `None` when it bowed
//! out to cancellation before starting; supervision guarantees that
//! every other way a worker can die - an error before the phase
//! executor produced an outcome, a panic, an aborted task - still
//! surfaces as a failed [`TargetOutcome`] for that target instead of
//! silently vanishing from the run report.

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use secret_sync_domain::entities::{Phase, TargetOutcome};
use secret_sync_domain::SyncError;

/// What a per-target worker resolves to: an outcome, or `None` when the
/// run was cancelled before the operation began.
pub type WorkerResult = Result<Option<TargetOutcome>, SyncError>;

/// Spawns one supervised per-target worker.
///
/// The worker's start and disposition are logged under the target's
/// name, so a hung layer can be attributed to a specific target from
/// the logs alone.
pub fn spawn_worker<F>(phase: Phase, target: String, fut: F) -> JoinHandle<WorkerResult>
where
    F: std::future::Future<Output = WorkerResult> + Send + 'static,
{
    debug!(target_name = %target, ?phase, "worker starting");

    tokio::spawn(async move {
        let result = fut.await;

        match &result {
            Ok(Some(outcome)) if outcome.success => {
                debug!(target_name = %target, duration_ms = outcome.duration_ms, "worker completed")
            }
            Ok(Some(outcome)) => {
                warn!(target_name = %target, error = ?outcome.error, "worker reported failure")
            }
            Ok(None) => debug!(target_name = %target, "worker skipped, run cancelled"),
            Err(e) => error!(target_name = %target, error = ?e, "worker failed before producing an outcome"),
        }

        result
    })
}

/// Joins one supervised worker.
///
/// Returns `None` only for the cancellation bow-out; every failure
/// mode, panics included, is converted into a failed outcome for the
/// target so the run report accounts for it.
pub async fn join_worker(target: String, phase: Phase, handle: JoinHandle<WorkerResult>) -> Option<TargetOutcome> {
    match handle.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(error)) => Some(TargetOutcome::failure(target, phase, 0, error.to_string())),
        Err(join_error) => {
            let reason = if join_error.is_panic() {
                format!("worker panicked: {join_error}")
            } else if join_error.is_cancelled() {
                SyncError::cancelled().to_string()
            } else {
                format!("worker join failed: {join_error}")
            };
            error!(target_name = %target, %reason, "worker task died");
            Some(TargetOutcome::failure(target, phase, 0, reason))
        }
    }
}
