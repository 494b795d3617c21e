// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secret Sync Binary
//!
//! Process entry point: parses the CLI, loads configuration, wires the
//! in-memory local store adapters (provider-backed adapters are supplied
//! by the embedding deployment), expands dynamic targets through
//! discovery, runs the pipeline, renders the diff, and exits with the
//! run's derived code.

use clap::Parser;
use std::sync::Arc;
use tracing::error;

use secret_sync::application::{MergePhase, Orchestrator, SyncPhase};
use secret_sync::infrastructure::config::SyncConfig;
use secret_sync::infrastructure::diff_render::{render_report, RenderOptions};
use secret_sync::infrastructure::discovery::{expand_dynamic_targets, AccountDiscovery};
use secret_sync::infrastructure::metrics::{NoopObserver, PrometheusObserver, SyncObserver};
use secret_sync::infrastructure::resilience::{BreakerSet, RetryPolicy};
use secret_sync::infrastructure::stores::{
    MemoryAccountDirectory, MemoryMergeStore, MemorySourceStore, MemoryTargetStoreProvider,
};
use secret_sync::infrastructure::versioning::VersioningStore;
use secret_sync::presentation::Cli;
use secret_sync_bootstrap::logger::{self, LogFormat};
use secret_sync_bootstrap::shutdown::ShutdownCoordinator;
use secret_sync_bootstrap::{signals, ExitCode};
use secret_sync_domain::services::NameResolver;
use secret_sync_domain::value_objects::{Secret, SecretPath};
use secret_sync_domain::SyncError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init(
        cli.verbose,
        if cli.json_logs { LogFormat::Json } else { LogFormat::Text },
    );

    let exit = match run(cli).await {
        Ok(code) => code,
        Err(startup_error) => {
            error!(error = %startup_error, "startup failed");
            ExitCode::from_startup_error(&startup_error)
        }
    };
    std::process::exit(exit.as_i32());
}

async fn run(cli: Cli) -> Result<ExitCode, SyncError> {
    let config = SyncConfig::load(cli.config.as_deref())?;
    let options = cli.run_options(&config);

    let coordinator = ShutdownCoordinator::default();
    signals::install(coordinator.clone());

    // Local store wiring. Deployments with real providers construct the
    // same orchestrator over their own port implementations.
    let source_store = Arc::new(MemorySourceStore::new());
    if let Some(seed) = &cli.seed {
        seed_source_store(&source_store, seed)?;
    }
    let merge_store = Arc::new(MemoryMergeStore::new());
    let target_provider = Arc::new(MemoryTargetStoreProvider::new());
    let directory = Arc::new(MemoryAccountDirectory::new());

    // Dynamic targets expand before the run; static declarations win on
    // name collisions.
    let mut targets = config.targets.clone();
    if !config.dynamic_targets.is_empty() {
        let discovery = AccountDiscovery::new(directory.clone(), config.discovery.cache_ttl());
        let cancel = coordinator.token();
        for template in &config.dynamic_targets {
            let accounts = discovery
                .discover(
                    template,
                    &config.discovery.tag_filters,
                    config.discovery.tag_combination,
                    &config.discovery.exclude_statuses,
                    &cancel,
                )
                .await?;
            let resolver = NameResolver::new(
                config.name_matching.name_rules(),
                config.name_matching.strategy,
                accounts.iter().map(|a| (a.name.clone(), a.id.clone())),
            );
            targets.extend(expand_dynamic_targets(
                template,
                &accounts,
                &config.targets,
                &resolver,
                &config.name_matching.rules,
            ));
        }
    }

    let versioning = config.merge_store.versioning.enabled.then(|| {
        Arc::new(VersioningStore::new(
            merge_store.clone(),
            config.merge_prefix.clone(),
            config.merge_store.versioning.retain_versions,
        ))
    });

    let breakers = Arc::new(BreakerSet::new());
    let retry = RetryPolicy::default();
    let observer: Arc<dyn SyncObserver> = match PrometheusObserver::new() {
        Ok(observer) => Arc::new(observer),
        Err(error) => {
            error!(error = %error, "metrics unavailable, continuing without");
            Arc::new(NoopObserver)
        }
    };

    let merge_phase = MergePhase::new(
        source_store,
        merge_store.clone(),
        versioning,
        config.merge_prefix.clone(),
        config.source.clone(),
        breakers.clone(),
        retry.clone(),
    );
    let sync_phase = SyncPhase::new(merge_store, target_provider, breakers, retry);

    let orchestrator = Orchestrator::new(
        config.sources.clone(),
        targets,
        config.merge_prefix.clone(),
        merge_phase,
        sync_phase,
        observer,
    )?;

    let report = orchestrator.run(&options, &coordinator.token()).await?;

    let rendered = render_report(
        &report,
        &RenderOptions {
            format: options.output_format,
            show_values: options.show_values,
            color: true,
        },
    );
    println!("{rendered}");

    Ok(ExitCode::from_run_code(report.exit_code()))
}

/// Loads a JSON seed file (`{"path/to/secret": {..}, ...}`) into the
/// local source store.
fn seed_source_store(store: &MemorySourceStore, path: &std::path::Path) -> Result<(), SyncError> {
    let raw = std::fs::read(path)
        .map_err(|e| SyncError::invalid_config(format!("cannot read seed file {path:?}: {e}")))?;
    let entries: std::collections::BTreeMap<String, serde_json::Map<String, serde_json::Value>> =
        serde_json::from_slice(&raw)
            .map_err(|e| SyncError::invalid_config(format!("malformed seed file {path:?}: {e}")))?;

    for (raw_path, secret) in entries {
        let path = SecretPath::parse(&raw_path)?;
        store.insert(&path, Secret::from_map(secret));
    }
    Ok(())
}
