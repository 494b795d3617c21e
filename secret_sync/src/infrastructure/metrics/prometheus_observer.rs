// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Prometheus Observer
//!
//! Prometheus-backed implementation of the sync observer: run and
//! per-target counters, per-phase duration histograms, and drift
//! counters, all registered under the `secret_sync` namespace. The
//! encoded text payload is exposed through [`PrometheusObserver::gather`]
//! for whatever endpoint the embedding process wires up.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

use secret_sync_domain::entities::{Phase, RunReport, TargetOutcome};
use secret_sync_domain::SyncError;

use super::SyncObserver;

/// Prometheus metrics collection for the pipeline.
pub struct PrometheusObserver {
    registry: Arc<Registry>,
    targets_processed_total: IntCounterVec,
    target_failures_total: IntCounterVec,
    target_duration_seconds: Histogram,
    secrets_changed_total: IntCounterVec,
    runs_completed_total: IntCounter,
    active_operations: IntGauge,
}

impl PrometheusObserver {
    /// Creates the observer and registers all metrics.
    pub fn new() -> Result<Self, SyncError> {
        let registry = Arc::new(Registry::new());

        let targets_processed_total = IntCounterVec::new(
            Opts::new("targets_processed_total", "Per-target operations completed").namespace("secret_sync"),
            &["phase"],
        )
        .map_err(|e| SyncError::metrics_error(format!("Failed to create targets_processed_total metric: {e}")))?;

        let target_failures_total = IntCounterVec::new(
            Opts::new("target_failures_total", "Per-target operations that failed").namespace("secret_sync"),
            &["phase"],
        )
        .map_err(|e| SyncError::metrics_error(format!("Failed to create target_failures_total metric: {e}")))?;

        let target_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("target_duration_seconds", "Duration of per-target operations")
                .namespace("secret_sync"),
        )
        .map_err(|e| SyncError::metrics_error(format!("Failed to create target_duration_seconds metric: {e}")))?;

        let secrets_changed_total = IntCounterVec::new(
            Opts::new("secrets_changed_total", "Diff entries by change type").namespace("secret_sync"),
            &["change"],
        )
        .map_err(|e| SyncError::metrics_error(format!("Failed to create secrets_changed_total metric: {e}")))?;

        let runs_completed_total = IntCounter::with_opts(
            Opts::new("runs_completed_total", "Pipeline runs completed").namespace("secret_sync"),
        )
        .map_err(|e| SyncError::metrics_error(format!("Failed to create runs_completed_total metric: {e}")))?;

        let active_operations = IntGauge::with_opts(
            Opts::new("active_operations", "Per-target operations currently running").namespace("secret_sync"),
        )
        .map_err(|e| SyncError::metrics_error(format!("Failed to create active_operations metric: {e}")))?;

        registry
            .register(Box::new(targets_processed_total.clone()))
            .map_err(|e| SyncError::metrics_error(format!("Failed to register targets_processed_total: {e}")))?;
        registry
            .register(Box::new(target_failures_total.clone()))
            .map_err(|e| SyncError::metrics_error(format!("Failed to register target_failures_total: {e}")))?;
        registry
            .register(Box::new(target_duration_seconds.clone()))
            .map_err(|e| SyncError::metrics_error(format!("Failed to register target_duration_seconds: {e}")))?;
        registry
            .register(Box::new(secrets_changed_total.clone()))
            .map_err(|e| SyncError::metrics_error(format!("Failed to register secrets_changed_total: {e}")))?;
        registry
            .register(Box::new(runs_completed_total.clone()))
            .map_err(|e| SyncError::metrics_error(format!("Failed to register runs_completed_total: {e}")))?;
        registry
            .register(Box::new(active_operations.clone()))
            .map_err(|e| SyncError::metrics_error(format!("Failed to register active_operations: {e}")))?;

        Ok(Self {
            registry,
            targets_processed_total,
            target_failures_total,
            target_duration_seconds,
            secrets_changed_total,
            runs_completed_total,
            active_operations,
        })
    }

    /// Encodes the current metric values in Prometheus text format.
    pub fn gather(&self) -> Result<String, SyncError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| SyncError::metrics_error(format!("Failed to encode metrics: {e}")))?;
        String::from_utf8(buffer).map_err(|e| SyncError::metrics_error(format!("Metrics were not UTF-8: {e}")))
    }

    /// Returns the underlying registry for endpoint wiring.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    fn phase_label(phase: Phase) -> &'static str {
        match phase {
            Phase::Merge => "merge",
            Phase::Sync => "sync",
        }
    }
}

impl SyncObserver for PrometheusObserver {
    fn on_target_started(&self, _phase: Phase, _target: &str) {
        self.active_operations.inc();
    }

    fn on_target_completed(&self, outcome: &TargetOutcome) {
        self.active_operations.dec();
        let phase = Self::phase_label(outcome.phase);
        self.targets_processed_total.with_label_values(&[phase]).inc();
        if !outcome.success {
            self.target_failures_total.with_label_values(&[phase]).inc();
        }
        self.target_duration_seconds
            .observe(outcome.duration_ms as f64 / 1000.0);

        if let Some(diff) = &outcome.diff {
            self.secrets_changed_total
                .with_label_values(&["added"])
                .inc_by(diff.totals.added as u64);
            self.secrets_changed_total
                .with_label_values(&["modified"])
                .inc_by(diff.totals.modified as u64);
            self.secrets_changed_total
                .with_label_values(&["removed"])
                .inc_by(diff.totals.removed as u64);
        }
    }

    fn on_run_completed(&self, _report: &RunReport) {
        self.runs_completed_total.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_target_lifecycle() {
        let observer = PrometheusObserver::new().unwrap();
        observer.on_target_started(Phase::Merge, "t");

        let mut outcome = TargetOutcome::success("t", Phase::Merge, 125);
        outcome.diff = Some(Default::default());
        observer.on_target_completed(&outcome);

        let rendered = observer.gather().unwrap();
        assert!(rendered.contains("secret_sync_targets_processed_total"));
        assert!(rendered.contains("secret_sync_target_duration_seconds"));
    }

    #[test]
    fn test_failures_counted_separately() {
        let observer = PrometheusObserver::new().unwrap();
        observer.on_target_started(Phase::Sync, "t");
        observer.on_target_completed(&TargetOutcome::failure("t", Phase::Sync, 10, "boom"));

        let rendered = observer.gather().unwrap();
        assert!(rendered.contains("secret_sync_target_failures_total"));
    }
}
