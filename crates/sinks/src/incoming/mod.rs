//! Per-token incoming event loggers
//!
//! Batch destinations don't receive events directly. Every event for a token
//! is appended to that token's incoming log, which batch uploaders read
//! later. One logger is shared by all batch destinations of a token.
//!
//! Files are named `incoming.tok=<token>.log` inside the log directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::common::{Event, SinkError, SinkMetrics};
use crate::traits::{Consumer, LoggerFactory};
use crate::util::{JsonLinesFile, RateLimitedLogger};

/// Logger name (and file stem) for a token
pub fn incoming_logger_name(token_id: &str) -> String {
    format!("incoming.tok={token_id}")
}

/// Appends a token's events to its incoming log
pub struct IncomingLogger {
    name: String,
    file: JsonLinesFile,
    metrics: SinkMetrics,
    error_logger: RateLimitedLogger,
}

impl IncomingLogger {
    /// Create a logger writing under `dir`. The file opens on first event.
    pub fn new(dir: &Path, token_id: &str) -> Self {
        let name = incoming_logger_name(token_id);
        Self {
            file: JsonLinesFile::new(dir.join(format!("{name}.log"))),
            error_logger: RateLimitedLogger::with_default_interval(name.clone()),
            metrics: SinkMetrics::new(),
            name,
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Logger metrics
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }
}

impl Consumer for IncomingLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn consume(&self, event: Arc<Event>) {
        match self.file.append(&event) {
            Ok(()) => {
                self.metrics.event_received();
                self.metrics.events_written(1);
            }
            Err(e) => {
                self.metrics.event_dropped();
                self.error_logger.warn("incoming log write failed", &e);
            }
        }
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.file.flush()?;
        self.metrics.flush();
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        self.file.close()
    }
}

impl std::fmt::Debug for IncomingLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingLogger")
            .field("name", &self.name)
            .field("path", &self.file.path())
            .finish()
    }
}

/// Creates incoming loggers inside a directory
#[derive(Debug, Clone)]
pub struct DiskLoggerFactory {
    dir: PathBuf,
}

impl DiskLoggerFactory {
    /// Create a factory writing into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory loggers write into
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LoggerFactory for DiskLoggerFactory {
    fn create_incoming_logger(&self, token_id: &str) -> Arc<dyn Consumer> {
        tracing::debug!(token = token_id, dir = %self.dir.display(), "creating incoming logger");
        Arc::new(IncomingLogger::new(&self.dir, token_id))
    }
}
