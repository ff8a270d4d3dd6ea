// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vault_sync::config::Config;
use vault_sync::kubernetes::KubeSecrets;
use vault_sync::reconcilers::{DeletionWatcher, PeriodicReconciler};
use vault_sync::sync::{TaskQueue, UpsertExecutor, WorkerPool};
use vault_sync::vault::VaultClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting vault-sync");

    // Load configuration
    let config = Config::from_env()?;
    let registry = Arc::new(config.registry()?);
    info!(
        "Configuration loaded: owner={}, {} of {} mappings in shard {}/{}, interval={:?}",
        config.owner,
        registry.len(),
        config.secrets.len(),
        config.shard.index,
        config.shard.count,
        config.refresh_interval()
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    let cluster = Arc::new(KubeSecrets::new(client));
    info!("Connected to Kubernetes cluster");

    let vault = Arc::new(VaultClient::connect(&config.vault).await?);
    info!("Connected to Vault at {}", config.vault.address);

    let (queue, queue_handle) = TaskQueue::new(config.queue_capacity());
    let executor = Arc::new(UpsertExecutor::new(vault, cluster.clone(), &config.owner));
    let pool = WorkerPool::new(queue, executor, config.workers());
    let periodic = PeriodicReconciler::new(
        cluster.clone(),
        registry.clone(),
        queue_handle.clone(),
        &config.owner,
    );
    let deletions = DeletionWatcher::new(
        cluster,
        registry,
        queue_handle,
        &config.owner,
        config.event_enqueue_timeout(),
    );

    let token = CancellationToken::new();
    let mut tasks = JoinSet::new();
    tasks.spawn(pool.run(token.clone()));
    tasks.spawn(periodic.run(config.refresh_interval(), token.clone()));
    tasks.spawn(deletions.run(token.clone()));

    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown requested"),
        Some(result) = tasks.join_next() => match result {
            Ok(Ok(())) => warn!("A component stopped unexpectedly, shutting down"),
            Ok(Err(e)) => error!("A component failed: {:#}, shutting down", e),
            Err(e) => error!("A component panicked: {}, shutting down", e),
        },
    }

    token.cancel();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Component failed during shutdown: {:#}", e),
            Err(e) => error!("Component panicked during shutdown: {}", e),
        }
    }

    info!("vault-sync stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
