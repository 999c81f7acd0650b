//! Sink utilities
//!
//! - **json_lines**: lazily opened append-only JSON lines file
//! - **rate_limited_logger**: error logging that won't flood under load

pub mod json_lines;
pub mod rate_limited_logger;

pub use json_lines::JsonLinesFile;
pub use rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
