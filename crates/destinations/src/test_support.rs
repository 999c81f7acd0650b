//! Test doubles for the storage and logger factories

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tell_auth::TokenStore;
use tell_config::{DestinationConfig, DestinationMode};
use tell_sinks::{
    Consumer, CreatedStorage, Event, LoggerFactory, SinkError, Storage, StorageFactory,
};

use crate::service::DestinationService;

/// Storage counting closes
pub struct MockStorage {
    id: String,
    closes: AtomicUsize,
}

impl MockStorage {
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Storage for MockStorage {
    fn id(&self) -> &str {
        &self.id
    }

    fn storage_type(&self) -> &'static str {
        "mock"
    }

    fn store(&self, events: &[Event]) -> Result<usize, SinkError> {
        Ok(events.len())
    }

    fn update(&self, _event: &Event) -> Result<(), SinkError> {
        Ok(())
    }

    fn clean(&self, _table: &str) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Consumer (queue or logger) counting closes and events
pub struct MockConsumer {
    name: String,
    closes: AtomicUsize,
    events: AtomicUsize,
    fail_close: bool,
}

impl MockConsumer {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            closes: AtomicUsize::new(0),
            events: AtomicUsize::new(0),
            fail_close: false,
        }
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }
}

impl Consumer for MockConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&self, _event: Arc<Event>) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) -> Result<(), SinkError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(SinkError::write(format!("{} refused to close", self.name)));
        }
        Ok(())
    }
}

/// Storage factory recording everything it builds
#[derive(Default)]
pub struct MockStorageFactory {
    storages: Mutex<Vec<Arc<MockStorage>>>,
    queues: Mutex<Vec<Arc<MockConsumer>>>,
    failing: Mutex<HashSet<String>>,
    failing_queue_close: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
}

impl MockStorageFactory {
    /// Number of `create` calls that succeeded
    pub fn creates(&self) -> usize {
        self.storages.lock().len()
    }

    /// Successful creates for one destination
    pub fn creates_of(&self, name: &str) -> usize {
        self.storages.lock().iter().filter(|s| s.id == name).count()
    }

    /// Most recent storage built for a destination
    pub fn storage(&self, name: &str) -> Option<Arc<MockStorage>> {
        self.storages.lock().iter().rev().find(|s| s.id == name).cloned()
    }

    /// Most recent queue built for a destination
    pub fn queue(&self, name: &str) -> Option<Arc<MockConsumer>> {
        self.queues.lock().iter().rev().find(|q| q.name == name).cloned()
    }

    /// Make `create` fail for a destination
    pub fn fail_for(&self, name: &str) {
        self.failing.lock().insert(name.to_string());
    }

    /// Let `create` succeed again for a destination
    pub fn heal(&self, name: &str) {
        self.failing.lock().remove(name);
    }

    /// Make every `create` take this long
    pub fn delay_creates(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Make the queue of a destination fail on close
    pub fn fail_queue_close_for(&self, name: &str) {
        self.failing_queue_close.lock().insert(name.to_string());
    }
}

#[async_trait]
impl StorageFactory for MockStorageFactory {
    async fn create(
        &self,
        name: &str,
        config: &DestinationConfig,
    ) -> Result<CreatedStorage, SinkError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().contains(name) {
            return Err(SinkError::init(format!("{name} is unreachable")));
        }

        let storage = Arc::new(MockStorage {
            id: name.to_string(),
            closes: AtomicUsize::new(0),
        });
        self.storages.lock().push(storage.clone());

        let queue = if config.mode == DestinationMode::Stream {
            let mut queue = MockConsumer::new(name);
            queue.fail_close = self.failing_queue_close.lock().contains(name);
            let queue = Arc::new(queue);
            self.queues.lock().push(queue.clone());
            Some(queue as Arc<dyn Consumer>)
        } else {
            None
        };

        Ok(CreatedStorage {
            storage,
            queue,
            worker: None,
        })
    }
}

/// Logger factory recording every logger it builds
#[derive(Default)]
pub struct MockLoggerFactory {
    loggers: Mutex<Vec<(String, Arc<MockConsumer>)>>,
    failing_close: Mutex<HashSet<String>>,
}

impl MockLoggerFactory {
    /// Loggers created for a token
    pub fn created(&self, token: &str) -> usize {
        self.loggers.lock().iter().filter(|(t, _)| t == token).count()
    }

    /// Most recent logger created for a token
    pub fn logger(&self, token: &str) -> Option<Arc<MockConsumer>> {
        self.loggers
            .lock()
            .iter()
            .rev()
            .find(|(t, _)| t == token)
            .map(|(_, logger)| logger.clone())
    }

    /// Make loggers of a token fail on close
    pub fn fail_close_for(&self, token: &str) {
        self.failing_close.lock().insert(token.to_string());
    }
}

impl LoggerFactory for MockLoggerFactory {
    fn create_incoming_logger(&self, token_id: &str) -> Arc<dyn Consumer> {
        let mut logger = MockConsumer::new(format!("incoming.tok={token_id}"));
        logger.fail_close = self.failing_close.lock().contains(token_id);
        let logger = Arc::new(logger);
        self.loggers
            .lock()
            .push((token_id.to_string(), logger.clone()));
        logger
    }
}

/// Service wired to mocks and a real token store
pub struct Harness {
    pub service: Arc<DestinationService>,
    pub storages: Arc<MockStorageFactory>,
    pub loggers: Arc<MockLoggerFactory>,
    pub tokens: Arc<TokenStore>,
}

impl Harness {
    /// Harness with the given token IDs known
    pub fn with_tokens(tokens: &[&str]) -> Self {
        let store = Arc::new(TokenStore::new());
        for token in tokens {
            store.insert(*token, [format!("{token}-secret")]);
        }

        let storages = Arc::new(MockStorageFactory::default());
        let loggers = Arc::new(MockLoggerFactory::default());
        let service = Arc::new(DestinationService::new(
            storages.clone(),
            loggers.clone(),
            store.clone(),
        ));

        Self {
            service,
            storages,
            loggers,
            tokens: store,
        }
    }
}

/// Batch destination config for the given tokens
pub fn batch(tokens: &[&str]) -> DestinationConfig {
    DestinationConfig::new("mock", DestinationMode::Batch).with_tokens(tokens.iter().copied())
}

/// Stream destination config for the given tokens
pub fn stream(tokens: &[&str]) -> DestinationConfig {
    DestinationConfig::new("mock", DestinationMode::Stream).with_tokens(tokens.iter().copied())
}

/// Build a snapshot from (name, config) pairs
pub fn snapshot<const N: usize>(
    destinations: [(&str, DestinationConfig); N],
) -> tell_config::DestinationsConfig {
    destinations
        .into_iter()
        .map(|(name, config)| (name.to_string(), config))
        .collect()
}
