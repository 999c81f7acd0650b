//! Destinations watcher
//!
//! Loads destination snapshots from a [`DestinationsSource`] and feeds them
//! to the [`DestinationService`]:
//!
//! - once, synchronously, at [`start`]
//! - every `destinations_reload_interval`
//! - whenever [`ReloadHandle::force_reload`] is called (e.g. after the token
//!   store reloaded)
//!
//! Timer ticks skip payloads identical to the last one and skip static
//! sources entirely, unless the last reconciliation left destinations
//! deferred or failed; those are retried every tick until they build.
//! Forced reloads always reconcile, so destinations deferred for missing
//! tokens get built as soon as tokens arrive.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tell_config::{DestinationsConfig, ServerConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{DestinationError, Result};
use crate::service::{DestinationService, ReconcileReport};
use crate::source::{DestinationsSource, Fetched};

/// HTTP fetch timeout
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Triggers an immediate reload
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    trigger: mpsc::Sender<()>,
}

impl ReloadHandle {
    /// Request a forced reload
    ///
    /// Requests made while one is already pending coalesce. Returns false
    /// once the watcher has stopped.
    pub fn force_reload(&self) -> bool {
        match self.trigger.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

/// Running watcher task
#[derive(Debug)]
pub struct WatcherHandle {
    /// Forced reload trigger
    pub reload: ReloadHandle,

    /// Watcher task; exits on cancellation
    pub task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Wait for the watcher to stop
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "destinations watcher task failed");
        }
    }
}

/// Background loader for one source
pub struct Watcher {
    service: Arc<DestinationService>,
    source: DestinationsSource,
    interval: Duration,
    client: reqwest::Client,
    trigger_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,

    /// SHA-256 of the last fetched payload
    last_digest: Option<[u8; 32]>,

    /// Last reconciliation left deferred or failed destinations
    pending: bool,
}

impl Watcher {
    /// Create a watcher and its reload handle
    ///
    /// Returns (watcher, handle). Spawn the watcher with [`Watcher::run`].
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client can't be built.
    pub fn new(
        service: Arc<DestinationService>,
        source: DestinationsSource,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Result<(Self, ReloadHandle)> {
        let (trigger, trigger_rx) = mpsc::channel(1);

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(DestinationError::HttpClient)?;

        let watcher = Self {
            service,
            source,
            interval,
            client,
            trigger_rx,
            cancel,
            last_digest: None,
            pending: false,
        };

        Ok((watcher, ReloadHandle { trigger }))
    }

    /// Fetch and reconcile once
    ///
    /// Unforced loads skip static sources and unchanged payloads, unless
    /// destinations are waiting to be retried. Returns `None` if nothing was
    /// reconciled.
    pub async fn load(&mut self, force: bool) -> Option<ReconcileReport> {
        let retry = force || self.pending;
        if !retry && self.source.is_static() {
            return None;
        }

        let fetched = match self.source.fetch(&self.client).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(source = %self.source, error = %e, "failed to load destinations");
                return None;
            }
        };

        let report = match fetched {
            Fetched::Parsed(snapshot) => self.service.reconcile(&snapshot).await,
            Fetched::Bytes(payload) => {
                let digest: [u8; 32] = Sha256::digest(&payload).into();
                if !retry && self.last_digest == Some(digest) {
                    tracing::trace!(source = %self.source, "destinations payload unchanged");
                    return None;
                }
                self.last_digest = Some(digest);

                // Parse errors are logged by the service; the bad payload
                // is skipped until it changes
                match self.service.update_from_bytes(&payload).await {
                    Ok(report) => report,
                    Err(_) => {
                        self.pending = false;
                        return None;
                    }
                }
            }
        };

        self.pending = report.has_pending();
        if self.pending {
            tracing::debug!(
                deferred = report.deferred.len(),
                failed = report.failed.len(),
                "destinations will be retried on the next tick"
            );
        }
        Some(report)
    }

    /// Run until cancelled
    pub async fn run(mut self) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            source = %self.source,
            kind = self.source.kind(),
            interval_secs = self.interval.as_secs(),
            "destinations watcher started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.load(false).await;
                }

                Some(()) = self.trigger_rx.recv() => {
                    tracing::debug!("forced destinations reload");
                    self.load(true).await;
                }

                _ = self.cancel.cancelled() => {
                    break;
                }
            }
        }

        tracing::info!("destinations watcher stopped");
    }
}

/// Load destinations once and start watching their source
///
/// Inline `[destinations]` tables win over `server.destinations_source`.
/// Returns `Ok(None)` (after logging an error) if neither is configured.
///
/// # Errors
///
/// Returns error if `server.destinations_reload_interval` is missing, the
/// source descriptor is unrecognized or the HTTP client can't be built.
pub async fn start(
    service: Arc<DestinationService>,
    server: &ServerConfig,
    inline: Option<DestinationsConfig>,
    cancel: CancellationToken,
) -> Result<Option<WatcherHandle>> {
    let interval = server
        .destinations_reload_interval
        .filter(|interval| !interval.is_zero())
        .ok_or(DestinationError::MissingReloadInterval)?;

    let descriptor = server
        .destinations_source
        .as_deref()
        .map(str::trim)
        .filter(|descriptor| !descriptor.is_empty());

    let source = match (inline, descriptor) {
        (Some(destinations), _) => DestinationsSource::Parsed(destinations),
        (None, Some(descriptor)) => DestinationsSource::parse(descriptor)?,
        (None, None) => {
            tracing::error!("destinations aren't configured");
            return Ok(None);
        }
    };

    let (mut watcher, reload) = Watcher::new(service, source, interval, cancel)?;
    watcher.load(true).await;
    let task = tokio::spawn(watcher.run());

    Ok(Some(WatcherHandle { reload, task }))
}

#[cfg(test)]
#[path = "watcher_test.rs"]
mod watcher_test;
