//! Tell - Sinks
//!
//! Storages, stream queues and incoming loggers used by the destinations
//! router.
//!
//! # Architecture
//!
//! Stream destinations own a dedicated queue drained into their storage.
//! Batch destinations share the per-token incoming logger, whose files are
//! picked up later by batch uploaders.
//!
//! ```text
//!                      ┌──> [EventQueue] ──> [StreamingWorker] ──> Storage (stream)
//! [Router] --Arc<Event>┤
//!                      └──> [IncomingLogger tok=<token>] ──> incoming.tok=<token>.log (batch)
//! ```
//!
//! # Available Storages
//!
//! | Type | Purpose |
//! |------|---------|
//! | `null` | Testing (discard all) |
//! | `stdout` | Debug output |
//! | `disk` | JSON lines file |

// =============================================================================
// Storage implementations
// =============================================================================

/// Null storage - discards all data
pub mod null;

/// Stdout storage - debug output
pub mod stdout;

/// Disk storage - JSON lines file
pub mod disk;

// =============================================================================
// Consumers
// =============================================================================

/// Stream-mode queues and workers
pub mod queue;

/// Per-token incoming loggers
pub mod incoming;

// =============================================================================
// Shared
// =============================================================================

/// Common types (Event, SinkError, SinkMetrics)
pub mod common;

/// Capability traits and factories
pub mod traits;

/// Storage factory for the built-in storage types
pub mod factory;

/// Shared utilities (JSON lines files, rate-limited logging)
pub mod util;

pub use common::{Event, MetricsSnapshot, SinkError, SinkMetrics};
pub use factory::SinkStorageFactory;
pub use incoming::{DiskLoggerFactory, IncomingLogger, incoming_logger_name};
pub use queue::{EventQueue, StreamingWorker};
pub use traits::{Consumer, CreatedStorage, LoggerFactory, Storage, StorageFactory};
