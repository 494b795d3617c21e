// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Orchestrator
//!
//! Drives a run end to end: allocates the request id, resolves the
//! effective target set (with dependency closure), executes merge layers
//! in order and the sync phase as a single parallel layer, and assembles
//! the run report.
//!
//! ## Scheduling
//!
//! Within a layer, per-target operations run concurrently up to the
//! configured parallelism (a semaphore bounds the pool). A layer starts
//! only after the preceding one has fully drained; targets in the same
//! layer are independent by construction of the dependency graph.
//!
//! ## Failure Policy
//!
//! A failed operation is recorded and, when `continue_on_error` is off,
//! cancels the run's child token: siblings already past their
//! cancellation check finish and are collected, unstarted operations
//! return quietly without an outcome. The report always contains
//! everything that completed.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, info_span, Instrument};

use secret_sync_bootstrap::shutdown::CancellationToken;
use secret_sync_domain::entities::{Operation, OutputFormat, Phase, RunReport, Source, Target};
use secret_sync_domain::services::DependencyGraph;
use secret_sync_domain::value_objects::{Parallelism, RunId, SecretPath};
use secret_sync_domain::SyncError;

use crate::infrastructure::metrics::SyncObserver;
use crate::infrastructure::runtime::{join_worker, spawn_worker};

use super::bundle_plan::BundlePlan;
use super::merge_phase::{MergePhase, MergePhaseOptions};
use super::sync_phase::{SyncPhase, SyncPhaseOptions};

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub operation: Operation,

    /// Requested targets; empty means all. Expanded to the transitive
    /// closure of their imports.
    pub targets: Vec<String>,

    pub dry_run: bool,
    pub continue_on_error: bool,
    pub parallelism: Parallelism,
    pub compute_diff: bool,
    pub output_format: OutputFormat,
    pub show_values: bool,
    pub delete_orphans: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            operation: Operation::Both,
            targets: Vec::new(),
            dry_run: false,
            continue_on_error: false,
            parallelism: Parallelism::default(),
            compute_diff: false,
            output_format: OutputFormat::Human,
            show_values: false,
            delete_orphans: false,
        }
    }
}

/// The pipeline orchestrator.
pub struct Orchestrator {
    sources: Vec<Source>,
    targets: Vec<Target>,
    graph: DependencyGraph,
    merge_prefix: SecretPath,
    merge_phase: Arc<MergePhase>,
    sync_phase: Arc<SyncPhase>,
    observer: Arc<dyn SyncObserver>,
}

impl Orchestrator {
    /// Creates the orchestrator over a fully resolved target set.
    ///
    /// # Errors
    ///
    /// Fails at startup with `UnresolvedImport` or `CycleDetected` when
    /// the declared topology is invalid; nothing is written in that case.
    pub fn new(
        sources: Vec<Source>,
        targets: Vec<Target>,
        merge_prefix: SecretPath,
        merge_phase: MergePhase,
        sync_phase: SyncPhase,
        observer: Arc<dyn SyncObserver>,
    ) -> Result<Self, SyncError> {
        let graph = DependencyGraph::build(&sources, &targets)?;
        Ok(Self {
            sources,
            targets,
            graph,
            merge_prefix,
            merge_phase: Arc::new(merge_phase),
            sync_phase: Arc::new(sync_phase),
            observer,
        })
    }

    /// Runs the pipeline.
    ///
    /// Per-target failures are embedded in the report (exit code 2);
    /// `Err` is reserved for startup-class failures such as an unknown
    /// requested target.
    pub async fn run(&self, options: &RunOptions, cancel: &CancellationToken) -> Result<RunReport, SyncError> {
        let run_id = RunId::new();
        let span = info_span!("pipeline_run", request_id = %run_id);
        self.run_inner(run_id, options, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: RunId,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunReport, SyncError> {
        let started = Instant::now();

        let subset = if options.targets.is_empty() {
            None
        } else {
            Some(self.graph.closure(&options.targets)?)
        };

        let plan = Arc::new(BundlePlan::build(
            &self.graph,
            &self.sources,
            &self.targets,
            subset.as_ref(),
            &self.merge_prefix,
        )?);

        info!(
            operation = ?options.operation,
            targets = plan.target_names().len(),
            layers = plan.layers().len(),
            parallelism = %options.parallelism,
            dry_run = options.dry_run,
            "run starting"
        );

        // The run's own cancellation: observes the caller's token, and
        // trips independently on failure when continue_on_error is off.
        let run_cancel = cancel.child();
        let report = Arc::new(Mutex::new(RunReport::new(run_id)));
        let semaphore = Arc::new(Semaphore::new(options.parallelism.get()));

        if options.operation.includes_merge() {
            let merge_options = MergePhaseOptions {
                dry_run: options.dry_run,
                compute_diff: options.compute_diff,
            };
            for layer in plan.layers() {
                self.run_merge_layer(
                    layer,
                    &plan,
                    &report,
                    &semaphore,
                    &run_cancel,
                    merge_options,
                    options.continue_on_error,
                )
                .await;

                if run_cancel.is_cancelled() {
                    break;
                }
            }
        }

        if options.operation.includes_sync() && !run_cancel.is_cancelled() {
            let sync_options = SyncPhaseOptions {
                dry_run: options.dry_run,
                compute_diff: options.compute_diff,
                delete_orphans: options.delete_orphans,
            };
            let all_targets = plan.target_names();
            self.run_sync_layer(&all_targets, &plan, &report, &semaphore, &run_cancel, sync_options, options.continue_on_error)
                .await;
        }

        let mut finished = Arc::try_unwrap(report)
            .map(Mutex::into_inner)
            .unwrap_or_else(|shared| shared.lock().clone());

        // Aggregate drift from the operation's final phase, so a `both`
        // run does not double-count the same change in merge and sync.
        let final_phase = if options.operation.includes_sync() {
            Phase::Sync
        } else {
            Phase::Merge
        };
        for outcome in finished.outcomes.iter().filter(|o| o.phase == final_phase) {
            if let Some(diff) = &outcome.diff {
                finished.totals += diff.totals;
            }
        }

        self.observer.on_run_completed(&finished);
        info!(
            succeeded = finished.succeeded(),
            failed = finished.failed(),
            duration_ms = started.elapsed().as_millis() as u64,
            exit_code = finished.exit_code(),
            "run complete"
        );

        Ok(finished)
    }

    /// Schedules one merge layer and waits for it to drain.
    #[allow(clippy::too_many_arguments)]
    async fn run_merge_layer(
        &self,
        layer: &[String],
        plan: &Arc<BundlePlan>,
        report: &Arc<Mutex<RunReport>>,
        semaphore: &Arc<Semaphore>,
        run_cancel: &CancellationToken,
        options: MergePhaseOptions,
        continue_on_error: bool,
    ) {
        let mut handles = Vec::with_capacity(layer.len());

        for target_name in layer {
            let Some(target_plan) = plan.plan_for(target_name).cloned() else {
                continue;
            };
            let phase_impl = Arc::clone(&self.merge_phase);
            let observer = Arc::clone(&self.observer);
            let semaphore = Arc::clone(semaphore);
            let token = run_cancel.clone();
            let name = target_name.clone();

            let handle = spawn_worker(Phase::Merge, target_name.clone(), async move {
                // Unstarted work bows out quietly once the run is
                // cancelled; whatever already ran stays in the report.
                if token.is_cancelled() {
                    return Ok(None);
                }
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncError::internal_error(format!("worker pool closed: {e}")))?;
                if token.is_cancelled() {
                    return Ok(None);
                }

                observer.on_target_started(Phase::Merge, &name);
                let outcome = phase_impl.merge_target(&target_plan, &options, &token).await;
                observer.on_target_completed(&outcome);
                Ok(Some(outcome))
            });
            handles.push((target_name.clone(), handle));
        }

        for (name, handle) in handles {
            let Some(outcome) = join_worker(name, Phase::Merge, handle).await else {
                continue;
            };
            let failed = !outcome.success;
            report.lock().outcomes.push(outcome);
            if failed && !continue_on_error {
                run_cancel.cancel();
            }
        }
    }

    /// Schedules the sync phase as one parallel layer.
    #[allow(clippy::too_many_arguments)]
    async fn run_sync_layer(
        &self,
        targets: &[String],
        plan: &Arc<BundlePlan>,
        report: &Arc<Mutex<RunReport>>,
        semaphore: &Arc<Semaphore>,
        run_cancel: &CancellationToken,
        options: SyncPhaseOptions,
        continue_on_error: bool,
    ) {
        let mut handles = Vec::with_capacity(targets.len());

        for target_name in targets {
            let Some(target_plan) = plan.plan_for(target_name).cloned() else {
                continue;
            };
            let phase_impl = Arc::clone(&self.sync_phase);
            let observer = Arc::clone(&self.observer);
            let semaphore = Arc::clone(semaphore);
            let token = run_cancel.clone();
            let name = target_name.clone();

            let handle = spawn_worker(Phase::Sync, target_name.clone(), async move {
                if token.is_cancelled() {
                    return Ok(None);
                }
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncError::internal_error(format!("worker pool closed: {e}")))?;
                if token.is_cancelled() {
                    return Ok(None);
                }

                observer.on_target_started(Phase::Sync, &name);
                let outcome = phase_impl.sync_target(&target_plan, &options, &token).await;
                observer.on_target_completed(&outcome);
                Ok(Some(outcome))
            });
            handles.push((target_name.clone(), handle));
        }

        for (name, handle) in handles {
            let Some(outcome) = join_worker(name, Phase::Sync, handle).await else {
                continue;
            };
            let failed = !outcome.success;
            report.lock().outcomes.push(outcome);
            if failed && !continue_on_error {
                run_cancel.cancel();
            }
        }
    }
}
