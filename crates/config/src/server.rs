//! Server configuration
//!
//! Where destination configs come from and how often they are re-read.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default capacity of a stream-mode destination queue
pub const DEFAULT_QUEUE_SIZE: usize = 10_000;

/// Server configuration
///
/// # Example
///
/// ```toml
/// [server]
/// destinations_reload_interval = "30s"
/// destinations_source = "https://config.internal/destinations"
/// log_dir = "/var/lib/tell/logs"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// How often destination configs are re-fetched.
    ///
    /// There is no default: the destinations service refuses to start
    /// without it.
    #[serde(with = "humantime_serde")]
    pub destinations_reload_interval: Option<Duration>,

    /// Destinations source descriptor: an `http(s)://` URL, a `file://` URL
    /// or absolute path, or an inline JSON object literal.
    pub destinations_source: Option<String>,

    /// Directory for incoming event logs and disk destinations
    pub log_dir: PathBuf,

    /// Capacity of each stream-mode destination queue
    pub queue_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            destinations_reload_interval: None,
            destinations_source: None,
            log_dir: PathBuf::from("logs"),
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert!(config.destinations_reload_interval.is_none());
        assert!(config.destinations_source.is_none());
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.queue_size, DEFAULT_QUEUE_SIZE);
    }

    #[test]
    fn test_humantime_interval() {
        let toml = r#"
destinations_reload_interval = "1m 30s"
destinations_source = "file:///etc/tell/destinations.json"
queue_size = 64
"#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.destinations_reload_interval,
            Some(Duration::from_secs(90))
        );
        assert_eq!(
            config.destinations_source.as_deref(),
            Some("file:///etc/tell/destinations.json")
        );
        assert_eq!(config.queue_size, 64);
    }

    #[test]
    fn test_invalid_interval() {
        let result = toml::from_str::<ServerConfig>("destinations_reload_interval = \"soon\"");
        assert!(result.is_err());
    }
}
