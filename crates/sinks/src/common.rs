//! Common types and utilities for sinks
//!
//! Shared functionality across all storages and consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// A single analytics event as received from the ingestion layer
pub type Event = serde_json::Map<String, serde_json::Value>;

/// Counters shared by storages, queues and loggers
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Events accepted
    pub events_received: AtomicU64,

    /// Events durably written
    pub events_written: AtomicU64,

    /// Events dropped (queue full or closed)
    pub events_dropped: AtomicU64,

    /// Write errors encountered
    pub write_errors: AtomicU64,

    /// Flush operations performed
    pub flush_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            events_received: AtomicU64::new(0),
            events_written: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        }
    }

    /// Record an accepted event
    #[inline]
    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record written events
    #[inline]
    pub fn events_written(&self, count: u64) {
        self.events_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a dropped event
    #[inline]
    pub fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a write error
    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a flush operation
    #[inline]
    pub fn flush(&self) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_written: self.events_written.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_written: u64,
    pub events_dropped: u64,
    pub write_errors: u64,
    pub flush_count: u64,
}

/// Common sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Storage initialization failed
    #[error("failed to initialize storage: {0}")]
    Init(String),

    /// Failed to write data
    #[error("write failed: {0}")]
    Write(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation not supported by this storage type
    #[error("{operation} is not supported by {storage_type} storage")]
    Unsupported {
        /// Operation name
        operation: &'static str,
        /// Storage type
        storage_type: &'static str,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource already closed
    #[error("'{0}' is closed")]
    Closed(String),
}

impl SinkError {
    /// Create an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a closed error
    pub fn closed(name: impl Into<String>) -> Self {
        Self::Closed(name.into())
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
