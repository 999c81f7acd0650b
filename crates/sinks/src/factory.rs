//! Storage factory mapping destination types to storages
//!
//! | Type | Storage | Settings |
//! |------|---------|----------|
//! | `null` | [`NullStorage`] | none |
//! | `stdout` | [`StdoutStorage`] | none |
//! | `disk` | [`DiskStorage`] | `path` (default `<data_dir>/<name>.log`) |
//!
//! Stream destinations additionally get an [`EventQueue`] drained by a
//! spawned [`StreamingWorker`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tell_config::{DEFAULT_QUEUE_SIZE, DestinationConfig};

use crate::common::SinkError;
use crate::disk::{self, DiskStorage};
use crate::null::{self, NullStorage};
use crate::queue::{EventQueue, StreamingWorker};
use crate::stdout::{self, StdoutStorage};
use crate::traits::{Consumer, CreatedStorage, Storage, StorageFactory};

/// Builds the storages this crate ships
#[derive(Debug, Clone)]
pub struct SinkStorageFactory {
    data_dir: PathBuf,
    queue_size: usize,
}

impl SinkStorageFactory {
    /// Create a factory
    ///
    /// `data_dir` holds disk storages without an explicit `path`.
    pub fn new(data_dir: impl Into<PathBuf>, queue_size: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            queue_size,
        }
    }

    fn build_storage(
        &self,
        name: &str,
        config: &DestinationConfig,
    ) -> Result<Arc<dyn Storage>, SinkError> {
        match config.destination_type.as_str() {
            null::STORAGE_TYPE => Ok(Arc::new(NullStorage::new(name))),
            stdout::STORAGE_TYPE => Ok(Arc::new(StdoutStorage::new(name))),
            disk::STORAGE_TYPE => {
                let path = config
                    .setting_str("path")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.data_dir.join(format!("{name}.log")));
                Ok(Arc::new(DiskStorage::open(name, path)?))
            }
            other => Err(SinkError::config(format!(
                "unknown destination type '{other}' for '{name}'"
            ))),
        }
    }
}

impl Default for SinkStorageFactory {
    fn default() -> Self {
        Self::new("data", DEFAULT_QUEUE_SIZE)
    }
}

#[async_trait]
impl StorageFactory for SinkStorageFactory {
    async fn create(
        &self,
        name: &str,
        config: &DestinationConfig,
    ) -> Result<CreatedStorage, SinkError> {
        let storage = self.build_storage(name, config)?;

        let (queue, worker) = if config.is_stream() {
            let (queue, rx) = EventQueue::new(name, self.queue_size);
            let worker = tokio::spawn(StreamingWorker::new(name, rx, storage.clone()).run());
            (Some(Arc::new(queue) as Arc<dyn Consumer>), Some(worker))
        } else {
            (None, None)
        };

        tracing::debug!(
            destination = name,
            storage_type = storage.storage_type(),
            mode = %config.mode,
            "storage created"
        );

        Ok(CreatedStorage {
            storage,
            queue,
            worker,
        })
    }
}
