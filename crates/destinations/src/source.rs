//! Where destination snapshots come from
//!
//! | Descriptor | Source |
//! |------------|--------|
//! | `http://…`, `https://…` | HTTP GET |
//! | `file:///…`, `/…` | Local file |
//! | `{…}` | Inline JSON literal |
//!
//! Destinations configured as TOML tables arrive already parsed.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tell_config::DestinationsConfig;

use crate::error::{DestinationError, Result};

/// A destinations config source
#[derive(Debug, Clone, PartialEq)]
pub enum DestinationsSource {
    /// `[destinations]` tables from the server config
    Parsed(DestinationsConfig),
    /// JSON payload served over HTTP
    Http(String),
    /// JSON payload in a local file
    File(PathBuf),
    /// Inline JSON payload
    Literal(String),
}

/// What a fetch produced
#[derive(Debug)]
pub enum Fetched {
    /// Snapshot that needs no parsing
    Parsed(DestinationsConfig),
    /// Raw JSON payload
    Bytes(Vec<u8>),
}

impl DestinationsSource {
    /// Parse a source descriptor
    ///
    /// # Errors
    ///
    /// Returns [`DestinationError::UnknownSource`] for anything that isn't a
    /// URL, a file path or a JSON object literal.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let descriptor = descriptor.trim();

        if descriptor.starts_with("http://") || descriptor.starts_with("https://") {
            Ok(Self::Http(descriptor.to_string()))
        } else if descriptor.contains("file://") || descriptor.starts_with('/') {
            Ok(Self::File(PathBuf::from(descriptor.replacen("file://", "", 1))))
        } else if descriptor.starts_with('{') && descriptor.ends_with('}') {
            Ok(Self::Literal(descriptor.to_string()))
        } else {
            Err(DestinationError::UnknownSource(descriptor.to_string()))
        }
    }

    /// Static sources never change between timer ticks
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Parsed(_) | Self::Literal(_))
    }

    /// Short source kind for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parsed(_) => "config",
            Self::Http(_) => "http",
            Self::File(_) => "file",
            Self::Literal(_) => "literal",
        }
    }

    /// Fetch the current snapshot
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read or the HTTP request fails.
    pub async fn fetch(&self, client: &reqwest::Client) -> Result<Fetched> {
        match self {
            Self::Parsed(config) => Ok(Fetched::Parsed(config.clone())),
            Self::Literal(payload) => Ok(Fetched::Bytes(payload.as_bytes().to_vec())),
            Self::File(path) => tokio::fs::read(path)
                .await
                .map(Fetched::Bytes)
                .map_err(|e| DestinationError::io(path, e)),
            Self::Http(url) => {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(|e| DestinationError::http(url, e))?;
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| DestinationError::http(url, e))?;
                Ok(Fetched::Bytes(body.to_vec()))
            }
        }
    }
}

impl FromStr for DestinationsSource {
    type Err = DestinationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DestinationsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(config) => write!(f, "config ({} destinations)", config.len()),
            Self::Http(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Literal(_) => f.write_str("inline literal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http() {
        assert_eq!(
            DestinationsSource::parse("https://config.example.com/destinations").unwrap(),
            DestinationsSource::Http("https://config.example.com/destinations".into())
        );
        assert!(matches!(
            DestinationsSource::parse("http://localhost:8000/d").unwrap(),
            DestinationsSource::Http(_)
        ));
    }

    #[test]
    fn test_parse_file() {
        assert_eq!(
            DestinationsSource::parse("file:///etc/tell/destinations.json").unwrap(),
            DestinationsSource::File("/etc/tell/destinations.json".into())
        );
        assert_eq!(
            DestinationsSource::parse("/etc/tell/destinations.json").unwrap(),
            DestinationsSource::File("/etc/tell/destinations.json".into())
        );
    }

    #[test]
    fn test_parse_literal() {
        let source = DestinationsSource::parse(r#"{"destinations": {}}"#).unwrap();
        assert!(matches!(source, DestinationsSource::Literal(_)));
        assert!(source.is_static());
    }

    #[test]
    fn test_parse_unknown() {
        for descriptor in ["ftp://host/file", "destinations.json", "{unterminated", ""] {
            assert!(
                matches!(
                    DestinationsSource::parse(descriptor),
                    Err(DestinationError::UnknownSource(_))
                ),
                "{descriptor} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_str() {
        let source: DestinationsSource = "/tmp/d.json".parse().unwrap();
        assert_eq!(source.kind(), "file");
        assert!(!source.is_static());
    }

    #[tokio::test]
    async fn test_fetch_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("destinations.json");
        std::fs::write(&path, br#"{"destinations": {}}"#).unwrap();

        let source = DestinationsSource::File(path);
        let fetched = source.fetch(&reqwest::Client::new()).await.unwrap();
        assert!(matches!(fetched, Fetched::Bytes(bytes) if bytes == br#"{"destinations": {}}"#));
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let source = DestinationsSource::File("/nonexistent/destinations.json".into());
        let err = source.fetch(&reqwest::Client::new()).await.unwrap_err();
        assert!(matches!(err, DestinationError::Io { .. }));
    }
}
