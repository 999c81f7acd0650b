//! Authorization token configuration
//!
//! Tokens identify who may write events, and destinations restrict
//! themselves to a subset of them via `only_tokens`.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Token source configuration
///
/// # Example
///
/// ```toml
/// [auth]
/// tokens_file = "configs/tokens.conf"
/// reload_interval = "30s"
/// ```
///
/// or inline, using the same line format as the tokens file:
///
/// ```toml
/// [auth]
/// tokens = ["web:js-secret,server-secret", "mobile"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Path to a tokens file (takes precedence over inline tokens)
    pub tokens_file: Option<PathBuf>,

    /// Inline token lines (`id` or `id:secret1,secret2`)
    pub tokens: Vec<String>,

    /// How often the tokens file is re-read. Unset disables reloading.
    #[serde(with = "humantime_serde")]
    pub reload_interval: Option<Duration>,
}

impl AuthConfig {
    /// Inline tokens in tokens-file format
    pub fn inline_tokens(&self) -> String {
        self.tokens.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert!(config.tokens_file.is_none());
        assert!(config.tokens.is_empty());
        assert!(config.reload_interval.is_none());
    }

    #[test]
    fn test_deserialize_file() {
        let toml = r#"
tokens_file = "configs/tokens.conf"
reload_interval = "10s"
"#;
        let config: AuthConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.tokens_file,
            Some(PathBuf::from("configs/tokens.conf"))
        );
        assert_eq!(config.reload_interval, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_inline_tokens() {
        let config: AuthConfig = toml::from_str(r#"tokens = ["a:s1", "b"]"#).unwrap();
        assert_eq!(config.inline_tokens(), "a:s1\nb");
    }
}
