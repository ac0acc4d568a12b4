use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::JikanClient;
use crate::cli::Cli;
use crate::config::AppConfig;
use crate::limiter::RequestLimiter;
use crate::notify::{Notification, Notifier, PushoverNotifier};
use crate::paths::default_state_file;
use crate::snapshot::SnapshotStore;
use crate::watcher::{Controller, Watcher};

pub async fn run(cli: Cli) -> Result<()> {
    let state_file = match cli.state_file.clone() {
        Some(path) => path,
        None => default_state_file()?,
    };
    let config = AppConfig::from_cli(&cli, state_file).context("invalid configuration")?;
    let settings = &config.watcher;

    info!("• MyAnimeList Watcher •");
    info!(
        seasons = settings.seasons,
        interval = ?settings.poll_interval,
        min_request_gap = ?settings.min_request_gap,
        state_file = %settings.state_file.display(),
        "starting watcher"
    );

    let limiter = Arc::new(RequestLimiter::new(settings.min_request_gap));
    let catalog = Arc::new(JikanClient::new(
        &settings.catalog_url,
        settings.request_timeout,
        Arc::clone(&limiter),
    ));
    let notifier = Arc::new(PushoverNotifier::new(
        config.pushover.token.clone(),
        config.pushover.user.clone(),
        settings.request_timeout,
    ));
    debug!(min_gap = ?limiter.min_gap(), "catalog requests throttled");

    let cancel = CancellationToken::new();
    let controller = Controller::start(
        Watcher::new(settings.seasons, catalog, notifier.clone(), limiter),
        SnapshotStore::new(settings.state_file.clone()),
        settings.poll_interval,
        cancel.clone(),
    )
    .await;

    let signal = shutdown_signal().await?;
    info!("signal '{signal}' caught: cleaning up before exiting");
    if let Err(err) = notifier.send(&Notification::stopping()).await {
        warn!(error = %err, "can't send stopping notification");
    }

    cancel.cancel();
    controller.wait_stopped().await;
    debug!("signal '{signal}' caught: watcher stopped: exiting");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for SIGINT")?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    Ok("Ctrl-C")
}
