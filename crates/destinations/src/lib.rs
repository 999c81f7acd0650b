//! Tell - Destinations
//!
//! Routes events to destinations by authorization token and keeps the
//! routing table in sync with a hot-reloadable destinations config.
//!
//! # Architecture
//!
//! ```text
//! [DestinationsSource] --snapshot--> [Watcher] --reconcile--> [DestinationService]
//!                                        ^                            |
//!                         force_reload   |          consumers(token)  v
//!                       [TokenStore hook]               [ingestion request path]
//! ```
//!
//! For every token the service exposes:
//!
//! - **consumers**: stream queues (one per destination) plus the token's
//!   shared incoming logger (once, for all its batch destinations)
//! - **storages**: storages of its batch destinations
//! - **destination IDs**: names of every non-staged destination it routes to
//!
//! Staged destinations are built but kept out of routing; they're reachable
//! only by name through [`DestinationService::storage_by_id`].

mod error;
mod hash;
mod logger_usage;
mod service;
mod source;
mod status;
mod tokenized;
mod unit;
mod watcher;

#[cfg(test)]
mod test_support;

pub use error::{CloseError, CloseFailure, DestinationError, Result};
pub use hash::ConfigHash;
pub use service::{DestinationService, ReconcileReport};
pub use source::{DestinationsSource, Fetched};
pub use status::ReloadStatus;
pub use tokenized::{ConsumerKey, Tokenized, TokenizedConsumers, TokenizedIds, TokenizedStorages};
pub use watcher::{ReloadHandle, Watcher, WatcherHandle, start};
