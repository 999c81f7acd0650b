//! Null storage - discards all data
//!
//! Useful for testing destination configs and measuring routing overhead
//! without any I/O.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::common::{Event, SinkError, SinkMetrics};
use crate::traits::Storage;

/// Storage type name
pub const STORAGE_TYPE: &str = "null";

/// Storage that accepts and drops every event
#[derive(Debug)]
pub struct NullStorage {
    id: String,
    metrics: Arc<SinkMetrics>,
    closed: AtomicBool,
}

impl NullStorage {
    /// Create a null storage for a destination
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metrics: Arc::new(SinkMetrics::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Metrics for this storage
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Check if the storage has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Storage for NullStorage {
    fn id(&self) -> &str {
        &self.id
    }

    fn storage_type(&self) -> &'static str {
        STORAGE_TYPE
    }

    fn store(&self, events: &[Event]) -> Result<usize, SinkError> {
        self.metrics.events_written(events.len() as u64);
        Ok(events.len())
    }

    fn update(&self, _event: &Event) -> Result<(), SinkError> {
        self.metrics.events_written(1);
        Ok(())
    }

    fn clean(&self, _table: &str) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_discarded_events() {
        let storage = NullStorage::new("bench");
        let events = vec![Event::new(), Event::new(), Event::new()];

        assert_eq!(storage.store(&events).unwrap(), 3);
        storage.update(&Event::new()).unwrap();

        assert_eq!(storage.metrics().snapshot().events_written, 4);
        assert_eq!(storage.id(), "bench");
        assert_eq!(storage.storage_type(), "null");
    }

    #[test]
    fn test_close_idempotent() {
        let storage = NullStorage::new("bench");
        storage.close().unwrap();
        storage.close().unwrap();
        assert!(storage.is_closed());
    }
}
