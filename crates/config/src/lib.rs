//! Tell Configuration
//!
//! TOML-based configuration for the destinations router, plus the
//! destination config model shared with hot-reloaded JSON payloads.
//!
//! # Parsing
//!
//! ```
//! use tell_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[server]\ndestinations_reload_interval = \"10s\"").unwrap();
//! assert!(config.server.destinations_reload_interval.is_some());
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [server]
//! destinations_reload_interval = "30s"
//! log_dir = "logs"
//!
//! [auth]
//! tokens = ["web:client-secret"]
//!
//! [destinations.archive]
//! type = "disk"
//! mode = "batch"
//! only_tokens = ["web"]
//! ```

mod auth;
mod destinations;
mod error;
mod logging;
mod server;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use auth::AuthConfig;
pub use destinations::{
    DestinationConfig, DestinationMode, DestinationsConfig, PAYLOAD_FORMAT_HELP,
    parse_destinations,
};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use server::{DEFAULT_QUEUE_SIZE, ServerConfig};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional; `[destinations]` absent means destinations
/// come from `server.destinations_source` instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Server settings (reload interval, destinations source)
    pub server: ServerConfig,

    /// Authorization tokens
    pub auth: AuthConfig,

    /// Inline destinations
    pub destinations: Option<DestinationsConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.queue_size == 0 {
            return Err(ConfigError::invalid_value(
                "server",
                "server",
                "queue_size",
                "must be greater than 0",
            ));
        }
        if let Some(destinations) = &self.destinations {
            destinations::validate_destinations(destinations)?;
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
