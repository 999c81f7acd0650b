//! Serve - wire the token store, sinks and destinations service together

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tell_auth::TokenStore;
use tell_config::{AuthConfig, Config};
use tell_destinations::DestinationService;
use tell_sinks::{DiskLoggerFactory, SinkStorageFactory};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run the router until SIGINT/SIGTERM
pub async fn run(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let tokens = Arc::new(load_tokens(&config.auth)?);
    info!(tokens = tokens.len(), "authorization tokens loaded");

    let log_dir = &config.server.log_dir;
    let service = Arc::new(DestinationService::new(
        Arc::new(SinkStorageFactory::new(log_dir, config.server.queue_size)),
        Arc::new(DiskLoggerFactory::new(log_dir)),
        tokens.clone(),
    ));

    let watcher = tell_destinations::start(
        service.clone(),
        &config.server,
        config.destinations.clone(),
        cancel.clone(),
    )
    .await
    .context("failed to start destinations service")?;

    // Destinations waiting for tokens get built once the token set changes
    if let Some(watcher) = &watcher {
        let reload = watcher.reload.clone();
        tokens.set_reload_hook(Box::new(move || {
            reload.force_reload();
        }));
    }

    let token_reloader = spawn_token_reloader(&config.auth, tokens, cancel.clone());

    info!(
        destinations = service.unit_count(),
        log_dir = %log_dir.display(),
        "tell-router running"
    );

    wait_for_shutdown().await;
    info!("shutdown signal received");

    cancel.cancel();
    if let Some(watcher) = watcher {
        watcher.join().await;
    }
    if let Some(handle) = token_reloader
        && let Err(e) = handle.await
    {
        error!(error = %e, "token reloader task failed");
    }

    if let Err(e) = service.close().await {
        error!(error = %e, "failed to close destinations cleanly");
    }

    info!("tell-router shutdown complete");
    Ok(())
}

/// Load tokens from the tokens file, or the inline list
fn load_tokens(auth: &AuthConfig) -> Result<TokenStore> {
    match &auth.tokens_file {
        Some(path) => TokenStore::from_file(path)
            .with_context(|| format!("failed to load tokens from {}", path.display())),
        None => {
            if auth.tokens.is_empty() {
                warn!("no authorization tokens configured, destinations will wait for them");
            }
            TokenStore::from_str(&auth.inline_tokens()).context("invalid inline tokens")
        }
    }
}

/// Periodically re-read the tokens file
fn spawn_token_reloader(
    auth: &AuthConfig,
    tokens: Arc<TokenStore>,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    let path = auth.tokens_file.clone()?;
    let period = auth.reload_interval.filter(|d| !d.is_zero())?;

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match tokens.reload(&path) {
                        Ok(changed) => tracing::debug!(changed, "tokens file checked"),
                        Err(e) => warn!(file = %path.display(), error = %e, "failed to reload tokens, keeping previous set"),
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    }))
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
