//! Daemon lifecycle: store, listener, metrics endpoint, signal handling

use anyhow::{Context, Result};
use prometheus_client::registry::Registry;
use sealpost_core::config::SealpostConfig;
use sealpost_net::{Listener, ListenerConfig, ListenerMetrics};
use sealpost_store::BlobStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub async fn run(config: SealpostConfig) -> Result<()> {
    let shutdown = CancellationToken::new();

    let mut registry = Registry::default();
    let metrics = ListenerMetrics::new(&mut registry);

    let listener = Listener::bind(
        &config.daemon.listen,
        BlobStore::new(),
        ListenerConfig::from(&config),
    )
    .await
    .with_context(|| format!("binding blob listener on {}", config.daemon.listen))?
    .with_metrics(metrics);

    if let Some(addr) = config.daemon.metrics_addr.clone() {
        let registry = Arc::new(registry);
        let token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::metrics::serve(addr, registry, token).await {
                error!("metrics server failed: {e}");
            }
        });
    }

    tokio::spawn(wait_for_signal(shutdown.clone()));

    listener.run(shutdown).await?;
    info!("daemon stopped");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("registering SIGTERM handler: {e}");
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        }
    }
    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c");
        }
    }

    shutdown.cancel();
}
