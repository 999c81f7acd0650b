//! One live destination

use std::sync::Arc;

use tell_config::DestinationMode;
use tell_sinks::{Consumer, Storage};
use tokio::task::JoinHandle;

use crate::error::CloseError;
use crate::hash::ConfigHash;

/// Resources of one constructed destination
///
/// Never mutated: a changed config replaces the unit wholesale.
pub(crate) struct Unit {
    pub(crate) name: String,

    /// Present iff the destination is in stream mode
    pub(crate) queue: Option<Arc<dyn Consumer>>,

    /// Drains `queue` into `storage`
    pub(crate) worker: Option<JoinHandle<u64>>,

    pub(crate) storage: Arc<dyn Storage>,

    /// Resolved token IDs at creation time
    pub(crate) token_ids: Vec<String>,

    /// Staged units stay out of the tokenized maps
    pub(crate) staged: bool,

    pub(crate) hash: ConfigHash,
}

impl Unit {
    pub(crate) fn mode(&self) -> DestinationMode {
        if self.queue.is_some() {
            DestinationMode::Stream
        } else {
            DestinationMode::Batch
        }
    }

    /// Close the queue, wait for its worker to drain, then close the storage
    ///
    /// Events accepted by the queue before close still reach the storage.
    pub(crate) async fn close(self) -> Result<(), CloseError> {
        let mut errors = CloseError::default();
        if let Some(queue) = &self.queue {
            errors.record(format!("destination '{}' queue", self.name), queue.close());
        }

        if let Some(worker) = self.worker {
            match worker.await {
                Ok(written) => {
                    tracing::debug!(destination = %self.name, written, "queue drained");
                }
                Err(e) => {
                    tracing::error!(destination = %self.name, error = %e, "streaming worker failed");
                }
            }
        }

        errors.record(
            format!("destination '{}' storage", self.name),
            self.storage.close(),
        );
        errors.into_result()
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("mode", &self.mode())
            .field("storage_type", &self.storage.storage_type())
            .field("token_ids", &self.token_ids)
            .field("staged", &self.staged)
            .field("hash", &self.hash)
            .finish()
    }
}
