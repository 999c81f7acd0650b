//! Stream-mode event queues
//!
//! A stream destination gets a dedicated bounded queue. Producers call
//! [`Consumer::consume`] which never blocks: when the queue is full the
//! event is dropped and counted. A [`StreamingWorker`] drains the queue into
//! the storage one event at a time.
//!
//! ```text
//! [consume] --Arc<Event>--> [EventQueue] --> [StreamingWorker] --> Storage::update
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::common::{Event, SinkError, SinkMetrics};
use crate::traits::{Consumer, Storage};
use crate::util::RateLimitedLogger;

/// Bounded, non-blocking event queue for one stream destination
pub struct EventQueue {
    name: String,

    /// Taken on close, which lets the worker drain and exit
    sender: Mutex<Option<mpsc::Sender<Arc<Event>>>>,

    metrics: Arc<SinkMetrics>,
    drop_logger: RateLimitedLogger,
}

impl EventQueue {
    /// Create a queue and the receiver its worker drains
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<Arc<Event>>) {
        let name = name.into();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Self {
            drop_logger: RateLimitedLogger::with_default_interval(format!("queue:{name}")),
            name,
            sender: Mutex::new(Some(tx)),
            metrics: Arc::new(SinkMetrics::new()),
        };
        (queue, rx)
    }

    /// Check if the queue has been closed
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Queue metrics
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }
}

impl Consumer for EventQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&self, event: Arc<Event>) {
        // Clone out so the lock isn't held while sending
        let Some(sender) = self.sender.lock().clone() else {
            self.metrics.event_dropped();
            self.drop_logger.warn("event dropped", &SinkError::closed(&self.name));
            return;
        };

        match sender.try_send(event) {
            Ok(()) => self.metrics.event_received(),
            Err(e) => {
                self.metrics.event_dropped();
                self.drop_logger.warn("event dropped", &e);
            }
        }
    }

    fn close(&self) -> Result<(), SinkError> {
        if self.sender.lock().take().is_some() {
            tracing::debug!(queue = %self.name, "queue closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Drains a queue into its storage
pub struct StreamingWorker {
    name: String,
    receiver: mpsc::Receiver<Arc<Event>>,
    storage: Arc<dyn Storage>,
    error_logger: RateLimitedLogger,
}

impl StreamingWorker {
    /// Create a worker for a queue receiver
    pub fn new(
        name: impl Into<String>,
        receiver: mpsc::Receiver<Arc<Event>>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let name = name.into();
        Self {
            error_logger: RateLimitedLogger::with_default_interval(format!("stream:{name}")),
            name,
            receiver,
            storage,
        }
    }

    /// Run until the queue is closed and drained
    ///
    /// Returns the number of events written.
    pub async fn run(mut self) -> u64 {
        tracing::debug!(destination = %self.name, "streaming worker started");

        let mut written = 0u64;
        while let Some(event) = self.receiver.recv().await {
            match self.storage.update(&event) {
                Ok(()) => written += 1,
                Err(e) => {
                    self.error_logger.warn("stream update failed", &e);
                }
            }
        }

        tracing::debug!(destination = %self.name, written, "streaming worker stopped");
        written
    }
}
