//! Change detection hash for destination configs

use std::fmt;

use sha2::{Digest, Sha256};
use tell_config::DestinationConfig;

/// SHA-256 over the canonical JSON of `(name, config)`
///
/// `config.settings` is an ordered map, so equal configs always encode to
/// the same bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigHash([u8; 32]);

impl ConfigHash {
    /// Hash a destination's name and (token-resolved) config
    ///
    /// # Errors
    ///
    /// Returns error if the config can't be serialized.
    pub fn compute(name: &str, config: &DestinationConfig) -> serde_json::Result<Self> {
        let encoded = serde_json::to_vec(&(name, config))?;
        Ok(Self(Sha256::digest(&encoded).into()))
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigHash({self})")
    }
}
