//! Stdout storage - debug output
//!
//! Prints each event as one compact JSON line prefixed with the destination
//! name. Not intended for production throughput.
//!
//! # Example Output
//!
//! ```text
//! [debug] {"event":"page_view","url":"/home"}
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::common::{Event, SinkError, SinkMetrics};
use crate::traits::Storage;

/// Storage type name
pub const STORAGE_TYPE: &str = "stdout";

/// Storage printing events to stdout
#[derive(Debug)]
pub struct StdoutStorage {
    id: String,
    metrics: SinkMetrics,
    closed: AtomicBool,
}

impl StdoutStorage {
    /// Create a stdout storage for a destination
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metrics: SinkMetrics::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Metrics for this storage
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    fn ensure_open(&self) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::closed(&self.id));
        }
        Ok(())
    }
}

/// Render one event line
fn format_line(id: &str, event: &Event) -> Result<String, SinkError> {
    Ok(format!("[{id}] {}", serde_json::to_string(event)?))
}

impl Storage for StdoutStorage {
    fn id(&self) -> &str {
        &self.id
    }

    fn storage_type(&self) -> &'static str {
        STORAGE_TYPE
    }

    fn store(&self, events: &[Event]) -> Result<usize, SinkError> {
        self.ensure_open()?;

        let mut out = std::io::stdout().lock();
        for event in events {
            writeln!(out, "{}", format_line(&self.id, event)?)?;
        }
        out.flush()?;

        self.metrics.events_written(events.len() as u64);
        Ok(events.len())
    }

    fn update(&self, event: &Event) -> Result<(), SinkError> {
        self.store(std::slice::from_ref(event)).map(|_| ())
    }

    fn clean(&self, _table: &str) -> Result<(), SinkError> {
        Err(SinkError::Unsupported {
            operation: "clean",
            storage_type: STORAGE_TYPE,
        })
    }

    fn close(&self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
