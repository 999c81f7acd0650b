//! Destinations error types

use std::fmt;
use std::path::PathBuf;

use tell_sinks::SinkError;
use thiserror::Error;

/// Result type for destinations operations
pub type Result<T> = std::result::Result<T, DestinationError>;

/// Errors starting the service or loading a destinations snapshot
#[derive(Debug, Error)]
pub enum DestinationError {
    /// `server.destinations_reload_interval` is required
    #[error("server.destinations_reload_interval can't be empty")]
    MissingReloadInterval,

    /// Source descriptor is neither a URL, a file path nor a JSON literal
    #[error("unknown destinations source: {0}")]
    UnknownSource(String),

    /// Failed to read a file source
    #[error("failed to read destinations file '{path}': {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Failed to build the HTTP client for the watcher
    #[error("failed to build destinations HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Failed to fetch an HTTP source
    #[error("failed to fetch destinations from {url}: {source}")]
    Http {
        /// Source URL
        url: String,
        /// Underlying HTTP error
        #[source]
        source: reqwest::Error,
    },
}

impl DestinationError {
    /// Create an Io error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an Http error
    pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.into(),
            source,
        }
    }
}

/// One resource that failed to close
#[derive(Debug)]
pub struct CloseFailure {
    /// What failed, e.g. "destination 'archive' storage"
    pub resource: String,
    /// Why
    pub error: SinkError,
}

/// Every close failure of a removal or shutdown
///
/// Closing never stops at the first failure; all resources are attempted
/// and their errors collected here.
#[derive(Debug, Default)]
pub struct CloseError {
    failures: Vec<CloseFailure>,
}

impl CloseError {
    /// Record a failure
    pub fn push(&mut self, resource: impl Into<String>, error: SinkError) {
        self.failures.push(CloseFailure {
            resource: resource.into(),
            error,
        });
    }

    /// Record a close result
    pub fn record(&mut self, resource: impl Into<String>, result: std::result::Result<(), SinkError>) {
        if let Err(error) = result {
            self.push(resource, error);
        }
    }

    /// Absorb another aggregate
    pub fn extend(&mut self, other: CloseError) {
        self.failures.extend(other.failures);
    }

    /// Failures collected so far
    pub fn failures(&self) -> &[CloseFailure] {
        &self.failures
    }

    /// Number of failures
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Check if nothing failed
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(())` if nothing failed
    pub fn into_result(self) -> std::result::Result<(), CloseError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} resource(s) failed to close", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {}: {}", failure.resource, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CloseError {}
