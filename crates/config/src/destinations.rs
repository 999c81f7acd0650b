//! Destination configuration types
//!
//! A destination is a named sink for events: a storage backend plus the
//! routing metadata (mode, authorized tokens, staging) the destinations
//! service needs to wire it up.
//!
//! Destination configs arrive either inline in the server TOML or as a JSON
//! payload fetched from an HTTP endpoint or file:
//!
//! ```json
//! {
//!   "destinations": {
//!     "warehouse": { "type": "disk", "mode": "batch", "only_tokens": ["token-a"] },
//!     "live":      { "type": "stdout", "mode": "stream" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// Help text logged whenever a destinations payload can't be parsed
pub const PAYLOAD_FORMAT_HELP: &str = "wrong destinations config format: each destination must \
     be a single key with its config as the value, e.g. \
     {\"destinations\": {\"custom_name\": {\"type\": \"disk\", \"mode\": \"batch\"}}}";

/// How events reach a destination's storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationMode {
    /// Events go through a dedicated in-process queue straight to the writer
    Stream,
    /// Events are appended to a per-token log and flushed in bulk (default)
    #[default]
    Batch,
}

impl DestinationMode {
    /// Mode name as used in config
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Batch => "batch",
        }
    }
}

impl fmt::Display for DestinationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a single destination
///
/// Backend-specific keys (hosts, paths, credentials) are kept verbatim in
/// `settings` so the destinations service can hash the complete config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Storage backend type (e.g. "disk", "stdout", "null")
    #[serde(rename = "type")]
    pub destination_type: String,

    /// Execution mode
    #[serde(default)]
    pub mode: DestinationMode,

    /// Tokens allowed to write here. Empty means every known token.
    #[serde(default)]
    pub only_tokens: Vec<String>,

    /// Staged destinations are reachable only through dry-run tooling
    #[serde(default)]
    pub staged: bool,

    /// Remaining backend-specific keys
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl DestinationConfig {
    /// Create a config with the given backend type and mode
    pub fn new(destination_type: impl Into<String>, mode: DestinationMode) -> Self {
        Self {
            destination_type: destination_type.into(),
            mode,
            only_tokens: Vec::new(),
            staged: false,
            settings: Map::new(),
        }
    }

    /// Restrict the destination to the given tokens
    #[must_use]
    pub fn with_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the destination as staged
    #[must_use]
    pub fn staged(mut self) -> Self {
        self.staged = true;
        self
    }

    /// Add a backend-specific setting
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Look up a backend-specific string setting
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(Value::as_str)
    }

    /// Check if the destination uses a dedicated stream queue
    #[inline]
    pub fn is_stream(&self) -> bool {
        self.mode == DestinationMode::Stream
    }
}

/// Full destinations snapshot: name → config, ordered by name
pub type DestinationsConfig = BTreeMap<String, DestinationConfig>;

/// JSON payload wrapper served by HTTP/file destination sources
#[derive(Debug, Deserialize)]
struct DestinationsPayload {
    #[serde(default)]
    destinations: DestinationsConfig,
}

/// Parse a JSON destinations payload
///
/// # Errors
///
/// Returns error if the payload is not valid JSON, has the wrong shape, or
/// contains a destination with an empty `type`.
pub fn parse_destinations(payload: &[u8]) -> Result<DestinationsConfig> {
    let parsed: DestinationsPayload = serde_json::from_slice(payload)?;
    validate_destinations(&parsed.destinations)?;
    Ok(parsed.destinations)
}

/// Validate a destinations snapshot
pub(crate) fn validate_destinations(destinations: &DestinationsConfig) -> Result<()> {
    for (name, destination) in destinations {
        if name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "destination",
                name,
                "name",
                "must not be empty",
            ));
        }
        if destination.destination_type.trim().is_empty() {
            return Err(ConfigError::missing_field("destination", name, "type"));
        }
    }
    Ok(())
}
