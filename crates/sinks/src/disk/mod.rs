//! Disk storage - JSON lines on local disk
//!
//! Every destination of type `disk` owns one file. Batches are appended and
//! flushed per call so a crash loses at most the in-flight batch.

use std::path::{Path, PathBuf};

use crate::common::{Event, SinkError, SinkMetrics};
use crate::traits::Storage;
use crate::util::JsonLinesFile;

/// Storage type name
pub const STORAGE_TYPE: &str = "disk";

/// Storage appending events to a JSON lines file
#[derive(Debug)]
pub struct DiskStorage {
    id: String,
    file: JsonLinesFile,
    metrics: SinkMetrics,
}

impl DiskStorage {
    /// Open (or create) the storage file
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Init`] if the file can't be opened.
    pub fn open(id: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let id = id.into();
        let path = path.into();
        let file = JsonLinesFile::open(&path).map_err(|e| {
            SinkError::init(format!("disk storage '{id}' at {}: {e}", path.display()))
        })?;

        Ok(Self {
            id,
            file,
            metrics: SinkMetrics::new(),
        })
    }

    /// Path of the storage file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Metrics for this storage
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    fn record<T>(&self, result: Result<T, SinkError>) -> Result<T, SinkError> {
        if result.is_err() {
            self.metrics.write_error();
        }
        result
    }
}

impl Storage for DiskStorage {
    fn id(&self) -> &str {
        &self.id
    }

    fn storage_type(&self) -> &'static str {
        STORAGE_TYPE
    }

    fn store(&self, events: &[Event]) -> Result<usize, SinkError> {
        let written = self.record(self.file.append_all(events))?;
        self.record(self.file.flush())?;

        self.metrics.events_written(written as u64);
        self.metrics.flush();
        Ok(written)
    }

    fn update(&self, event: &Event) -> Result<(), SinkError> {
        self.record(self.file.append(event))?;
        self.record(self.file.flush())?;

        self.metrics.events_written(1);
        Ok(())
    }

    fn clean(&self, table: &str) -> Result<(), SinkError> {
        tracing::info!(storage = %self.id, table, "cleaning disk storage");
        self.file.truncate()
    }

    fn close(&self) -> Result<(), SinkError> {
        self.file.close()
    }
}
