//! Capability traits the destinations service is built on
//!
//! The service never sees concrete storages. It holds `Arc<dyn Storage>`
//! and `Arc<dyn Consumer>` handles produced by the two factories below.

use std::sync::Arc;

use async_trait::async_trait;
use tell_config::DestinationConfig;
use tokio::task::JoinHandle;

use crate::common::{Event, SinkError};

/// Accepts events on the hot path
///
/// Implemented by stream queues (one per destination) and incoming loggers
/// (one per token, shared by every batch destination of that token).
pub trait Consumer: Send + Sync {
    /// Name for logging
    fn name(&self) -> &str;

    /// Accept an event. Never blocks; failures are counted and logged.
    fn consume(&self, event: Arc<Event>);

    /// Flush buffered events
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Stop accepting events and release resources. Idempotent.
    fn close(&self) -> Result<(), SinkError>;
}

/// A constructed storage backend
pub trait Storage: Send + Sync {
    /// Destination name this storage was created for
    fn id(&self) -> &str;

    /// Backend type name (e.g. "disk")
    fn storage_type(&self) -> &'static str;

    /// Write a batch of events, returning how many were written
    fn store(&self, events: &[Event]) -> Result<usize, SinkError>;

    /// Write a single event (stream mode)
    fn update(&self, event: &Event) -> Result<(), SinkError>;

    /// Remove all stored data for a table
    fn clean(&self, table: &str) -> Result<(), SinkError>;

    /// Flush and release the backend. Idempotent.
    fn close(&self) -> Result<(), SinkError>;
}

/// Output of [`StorageFactory::create`]
pub struct CreatedStorage {
    /// The storage handle
    pub storage: Arc<dyn Storage>,

    /// Dedicated event queue, present iff the destination is in stream mode
    pub queue: Option<Arc<dyn Consumer>>,

    /// Task draining `queue` into `storage`; resolves to the events written
    ///
    /// Finishes once the queue is closed and drained. The storage must not
    /// be closed before that.
    pub worker: Option<JoinHandle<u64>>,
}

impl std::fmt::Debug for CreatedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedStorage")
            .field("storage", &self.storage.id())
            .field("type", &self.storage.storage_type())
            .field("queue", &self.queue.as_ref().map(|q| q.name().to_string()))
            .field("worker", &self.worker.is_some())
            .finish()
    }
}

/// Builds storages (and stream queues) from destination configs
#[async_trait]
pub trait StorageFactory: Send + Sync {
    /// Construct the storage for a destination
    ///
    /// `config.only_tokens` already holds resolved token IDs.
    async fn create(
        &self,
        name: &str,
        config: &DestinationConfig,
    ) -> Result<CreatedStorage, SinkError>;
}

/// Builds the per-token incoming event loggers used by batch destinations
pub trait LoggerFactory: Send + Sync {
    /// Create the incoming logger for a token
    fn create_incoming_logger(&self, token_id: &str) -> Arc<dyn Consumer>;
}
