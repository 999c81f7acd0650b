//! Destinations routing service
//!
//! Keeps the token → consumers/storages/destination IDs projection in sync
//! with the latest destinations snapshot.
//!
//! # Reconciliation
//!
//! Every snapshot is diffed against the live units:
//!
//! 1. units missing from the snapshot are unregistered and closed
//! 2. units whose config hash changed are unregistered, closed and rebuilt
//! 3. new units are built through the [`StorageFactory`]
//! 4. this cycle's new entries are merged into the live maps
//!
//! Unchanged units are left alone, so their queues and storages survive
//! reloads untouched.
//!
//! # Locking
//!
//! One `RwLock` guards units, loggers and the tokenized maps. Writers hold
//! it only to unregister, register and publish; storage construction and
//! resource closing happen outside it. A separate async mutex allows one
//! reconciliation at a time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tell_auth::TokenResolver;
use tell_config::{
    ConfigError, DestinationConfig, DestinationMode, DestinationsConfig, PAYLOAD_FORMAT_HELP,
    parse_destinations,
};
use tell_sinks::{Consumer, LoggerFactory, Storage, StorageFactory};

use crate::error::CloseError;
use crate::hash::ConfigHash;
use crate::logger_usage::LoggerUsage;
use crate::status::ReloadStatus;
use crate::tokenized::{ConsumerKey, TokenizedConsumers, TokenizedIds, TokenizedStorages};
use crate::unit::Unit;

/// Outcome of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Destinations built for the first time
    pub created: Vec<String>,

    /// Destinations rebuilt because their config changed
    pub recreated: Vec<String>,

    /// Destinations torn down without replacement
    pub removed: Vec<String>,

    /// Destinations left untouched
    pub unchanged: usize,

    /// Destinations waiting for authorization tokens
    pub deferred: Vec<String>,

    /// Destinations whose construction failed this cycle
    pub failed: Vec<String>,
}

impl ReconcileReport {
    /// True if no unit was built or torn down
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.recreated.is_empty() && self.removed.is_empty()
    }

    /// True if some destination still has to be built on a later cycle
    pub fn has_pending(&self) -> bool {
        !self.deferred.is_empty() || !self.failed.is_empty()
    }
}

/// Live routing state
#[derive(Default)]
struct State {
    units: HashMap<String, Unit>,
    loggers: HashMap<String, LoggerUsage>,
    consumers: TokenizedConsumers,
    storages: TokenizedStorages,
    ids: TokenizedIds,
}

/// Entries produced by one reconciliation, merged at the end
#[derive(Default)]
struct Additions {
    consumers: TokenizedConsumers,
    storages: TokenizedStorages,
    ids: TokenizedIds,
}

/// A unit taken out of the maps, with any loggers it was the last user of
struct Removed {
    unit: Unit,
    loggers: Vec<(String, Arc<dyn Consumer>)>,
}

impl Removed {
    /// Close loggers first, then the unit's own resources
    async fn close(self) -> Result<(), CloseError> {
        let mut errors = CloseError::default();
        for (token, logger) in self.loggers {
            errors.record(format!("logger for token '{token}'"), logger.close());
        }
        if let Err(unit_errors) = self.unit.close().await {
            errors.extend(unit_errors);
        }
        errors.into_result()
    }
}

impl State {
    /// Unregister a unit from every map
    ///
    /// Resources are returned, not closed: the caller closes them after
    /// releasing the lock.
    fn unregister(&mut self, name: &str) -> Option<Removed> {
        let unit = self.units.remove(name)?;
        let mut loggers = Vec::new();

        if !unit.staged {
            for token in &unit.token_ids {
                if unit.queue.is_some() {
                    self.consumers
                        .remove(token, &ConsumerKey::Queue(name.to_string()));
                } else if let Some(usage) = self.loggers.get_mut(token)
                    && usage.release() == 0
                {
                    self.consumers
                        .remove(token, &ConsumerKey::Logger(token.clone()));
                    if let Some(usage) = self.loggers.remove(token) {
                        loggers.push((token.clone(), usage.into_logger()));
                    }
                }

                self.storages.remove(token, name);
                self.ids.remove(token, name);
            }
        }

        Some(Removed { unit, loggers })
    }

    /// Register a freshly built unit, collecting its map entries
    fn register(
        &mut self,
        unit: Unit,
        additions: &mut Additions,
        logger_factory: &dyn LoggerFactory,
    ) {
        if unit.staged {
            tracing::warn!(
                destination = %unit.name,
                "skipping consumer creation for staged destination"
            );
        } else {
            for token in &unit.token_ids {
                additions.ids.add(token, unit.name.clone(), ());

                match &unit.queue {
                    Some(queue) => {
                        additions.consumers.add(
                            token,
                            ConsumerKey::Queue(unit.name.clone()),
                            queue.clone(),
                        );
                    }
                    None => {
                        let usage = self.loggers.entry(token.clone()).or_insert_with(|| {
                            LoggerUsage::new(logger_factory.create_incoming_logger(token))
                        });
                        usage.acquire();

                        // One logger entry per token, however many batch destinations share it
                        additions.consumers.add(
                            token,
                            ConsumerKey::Logger(token.clone()),
                            usage.logger().clone(),
                        );
                        additions
                            .storages
                            .add(token, unit.name.clone(), unit.storage.clone());
                    }
                }
            }
        }

        self.units.insert(unit.name.clone(), unit);
    }

    fn publish(&mut self, additions: Additions) {
        self.consumers.merge(additions.consumers);
        self.storages.merge(additions.storages);
        self.ids.merge(additions.ids);
    }
}

/// Hot-reloadable destinations routing service
///
/// Lookups are safe from any thread and return copies.
pub struct DestinationService {
    storage_factory: Arc<dyn StorageFactory>,
    logger_factory: Arc<dyn LoggerFactory>,
    resolver: Arc<dyn TokenResolver>,

    state: RwLock<State>,

    /// Serializes reconciliations
    reconcile_lock: tokio::sync::Mutex<()>,

    status: ReloadStatus,
}

impl DestinationService {
    /// Create an empty service
    pub fn new(
        storage_factory: Arc<dyn StorageFactory>,
        logger_factory: Arc<dyn LoggerFactory>,
        resolver: Arc<dyn TokenResolver>,
    ) -> Self {
        Self {
            storage_factory,
            logger_factory,
            resolver,
            state: RwLock::new(State::default()),
            reconcile_lock: tokio::sync::Mutex::new(()),
            status: ReloadStatus::default(),
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Consumers that should receive events for a token
    pub fn consumers(&self, token_id: &str) -> Vec<Arc<dyn Consumer>> {
        self.state.read().consumers.values(token_id)
    }

    /// Keys of a token's consumer entries
    pub fn consumer_keys(&self, token_id: &str) -> HashSet<ConsumerKey> {
        self.state.read().consumers.keys(token_id)
    }

    /// Storages of a token's batch destinations
    pub fn storages(&self, token_id: &str) -> Vec<Arc<dyn Storage>> {
        self.state.read().storages.values(token_id)
    }

    /// Storage of a destination by name, staged ones included
    pub fn storage_by_id(&self, name: &str) -> Option<Arc<dyn Storage>> {
        self.state
            .read()
            .units
            .get(name)
            .map(|unit| unit.storage.clone())
    }

    /// Names of the destinations a token routes to
    pub fn destination_ids(&self, token_id: &str) -> HashSet<String> {
        self.state.read().ids.keys(token_id)
    }

    /// Number of batch destinations sharing a token's incoming logger
    pub fn logger_usage(&self, token_id: &str) -> Option<usize> {
        self.state.read().loggers.get(token_id).map(LoggerUsage::usage)
    }

    /// Number of live destinations
    pub fn unit_count(&self) -> usize {
        self.state.read().units.len()
    }

    /// Names of live destinations, sorted
    pub fn destination_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().units.keys().cloned().collect();
        names.sort();
        names
    }

    /// True while a reconciliation is in progress
    pub fn is_reloading(&self) -> bool {
        self.status.is_reloading()
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Parse a JSON destinations payload and reconcile against it
    ///
    /// # Errors
    ///
    /// Returns error if the payload can't be parsed. Live state is left
    /// untouched in that case.
    pub async fn update_from_bytes(&self, payload: &[u8]) -> Result<ReconcileReport, ConfigError> {
        let snapshot = parse_destinations(payload).inspect_err(|e| {
            tracing::error!(error = %e, "{PAYLOAD_FORMAT_HELP}");
        })?;
        Ok(self.reconcile(&snapshot).await)
    }

    /// Bring live units in line with a full destinations snapshot
    ///
    /// Per-destination failures are logged and reported, never fatal.
    pub async fn reconcile(&self, snapshot: &DestinationsConfig) -> ReconcileReport {
        let _serial = self.reconcile_lock.lock().await;
        let reloading = self.status.begin();
        let mut report = ReconcileReport::default();

        // Remove destinations absent from the snapshot
        let mut stale: Vec<String> = self
            .state
            .read()
            .units
            .keys()
            .filter(|name| !snapshot.contains_key(*name))
            .cloned()
            .collect();
        stale.sort();
        if !stale.is_empty() {
            let removed: Vec<Removed> = {
                let mut state = self.state.write();
                stale.iter().filter_map(|name| state.unregister(name)).collect()
            };
            for removed in removed {
                let name = removed.unit.name.clone();
                close_removed(removed).await;
                report.removed.push(name);
            }
        }

        // Create or recreate
        let mut additions = Additions::default();
        for (name, config) in snapshot {
            let mut resolved = config.clone();
            resolved.only_tokens = self.resolve_tokens(name, &config.only_tokens);

            let hash = match ConfigHash::compute(name, &resolved) {
                Ok(hash) => hash,
                Err(e) => {
                    tracing::error!(destination = %name, error = %e, "failed to hash destination config");
                    report.failed.push(name.clone());
                    continue;
                }
            };

            let live_hash = self.state.read().units.get(name).map(|unit| unit.hash);
            let replacing = match live_hash {
                Some(live) if live == hash => {
                    report.unchanged += 1;
                    continue;
                }
                Some(_) => {
                    let removed = self.state.write().unregister(name);
                    if let Some(removed) = removed {
                        close_removed(removed).await;
                    }
                    true
                }
                None => false,
            };

            match self.build_unit(name, resolved, hash).await {
                Build::Ready(unit) => {
                    self.state
                        .write()
                        .register(unit, &mut additions, self.logger_factory.as_ref());
                    tracing::info!(destination = %name, recreated = replacing, "destination initialized");
                    if replacing {
                        report.recreated.push(name.clone());
                    } else {
                        report.created.push(name.clone());
                    }
                }
                outcome => {
                    if replacing {
                        report.removed.push(name.clone());
                    }
                    match outcome {
                        Build::Deferred => report.deferred.push(name.clone()),
                        _ => report.failed.push(name.clone()),
                    }
                }
            }
        }

        self.state.write().publish(additions);
        drop(reloading);

        let units = self.unit_count();
        if units == 0 {
            tracing::warn!("destinations are empty");
        }
        tracing::debug!(
            units,
            created = report.created.len(),
            recreated = report.recreated.len(),
            removed = report.removed.len(),
            unchanged = report.unchanged,
            deferred = report.deferred.len(),
            failed = report.failed.len(),
            "destinations reconciled"
        );

        report
    }

    /// Map `only_tokens` to token IDs; empty means every known token
    fn resolve_tokens(&self, name: &str, only_tokens: &[String]) -> Vec<String> {
        let ids = if only_tokens.is_empty() {
            tracing::warn!(destination = %name, "only_tokens aren't provided, all tokens will be stored");
            self.resolver.all_token_ids()
        } else {
            self.resolver.resolve_ids(only_tokens)
        };

        let mut seen = HashSet::with_capacity(ids.len());
        ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
    }

    /// Construct a unit's storage (and queue) outside the state lock
    async fn build_unit(&self, name: &str, config: DestinationConfig, hash: ConfigHash) -> Build {
        if config.only_tokens.is_empty() {
            tracing::warn!(
                destination = %name,
                "destination's authorization isn't ready, will be created in the next reload cycle"
            );
            return Build::Deferred;
        }

        let created = match self.storage_factory.create(name, &config).await {
            Ok(created) => created,
            Err(e) => {
                tracing::error!(
                    destination = %name,
                    destination_type = %config.destination_type,
                    error = %e,
                    "failed to initialize destination"
                );
                return Build::Failed;
            }
        };

        let mut worker = created.worker;
        let queue = match (config.mode, created.queue) {
            (DestinationMode::Stream, Some(queue)) => Some(queue),
            (DestinationMode::Stream, None) => {
                tracing::error!(destination = %name, "stream destination was created without a queue");
                if let Err(e) = created.storage.close() {
                    tracing::warn!(destination = %name, error = %e, "failed to close storage");
                }
                return Build::Failed;
            }
            (DestinationMode::Batch, Some(queue)) => {
                tracing::warn!(destination = %name, "batch destination was created with a queue, closing it");
                if let Err(e) = queue.close() {
                    tracing::warn!(destination = %name, error = %e, "failed to close queue");
                }
                // Nothing was queued yet, so the worker exits on its own
                worker = None;
                None
            }
            (DestinationMode::Batch, None) => None,
        };

        Build::Ready(Unit {
            name: name.to_string(),
            queue,
            worker,
            storage: created.storage,
            token_ids: config.only_tokens,
            staged: config.staged,
            hash,
        })
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Close every shared logger and every unit
    ///
    /// Waits for an in-flight reconciliation to finish first, so nothing is
    /// registered behind the shutdown. Stream queues are drained into their
    /// storages before those close. All resources are attempted; failures
    /// are aggregated. A second call has nothing left to close.
    ///
    /// # Errors
    ///
    /// Returns every close failure.
    pub async fn close(&self) -> Result<(), CloseError> {
        let _serial = self.reconcile_lock.lock().await;
        let (loggers, units) = {
            let mut state = self.state.write();
            let loggers = std::mem::take(&mut state.loggers);
            let units = std::mem::take(&mut state.units);
            state.consumers.clear();
            state.storages.clear();
            state.ids.clear();
            (loggers, units)
        };

        let mut errors = CloseError::default();
        for (token, usage) in loggers {
            errors.record(format!("logger for token '{token}'"), usage.logger().close());
        }
        for unit in units.into_values() {
            if let Err(unit_errors) = unit.close().await {
                errors.extend(unit_errors);
            }
        }

        tracing::info!(failures = errors.len(), "destinations closed");
        errors.into_result()
    }
}

impl std::fmt::Debug for DestinationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DestinationService")
            .field("units", &state.units.len())
            .field("loggers", &state.loggers.len())
            .field("reloading", &self.status.is_reloading())
            .finish()
    }
}

enum Build {
    Ready(Unit),
    Deferred,
    Failed,
}

/// Close a removed unit, logging failures
async fn close_removed(removed: Removed) {
    let name = removed.unit.name.clone();
    if let Err(e) = removed.close().await {
        tracing::warn!(destination = %name, error = %e, "error closing destination unit");
    }
    tracing::info!(destination = %name, "destination removed");
}

#[cfg(test)]
#[path = "service_test.rs"]
mod service_test;
