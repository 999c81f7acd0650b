//! Token store with hot reload
//!
//! The `TokenStore` holds every known token ID together with its secrets.
//! Destinations reference tokens by either form; resolution always yields
//! token IDs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{AuthError, Result};
use crate::resolver::TokenResolver;

/// Callback fired after a reload changed the token set
pub type ReloadHook = Box<dyn Fn() + Send + Sync>;

/// Thread-safe token store
///
/// Supports atomic reload for hot configuration updates.
///
/// # Example
///
/// ```
/// use tell_auth::{TokenResolver, TokenStore};
///
/// let store = TokenStore::new();
/// store.insert("web", ["js-secret"]);
///
/// let ids = store.resolve_ids(&["js-secret".to_string()]);
/// assert_eq!(ids, vec!["web"]);
/// ```
pub struct TokenStore {
    /// Token data protected by RwLock for concurrent access
    inner: RwLock<StoreInner>,

    /// Fired after a reload that changed the token set
    reload_hook: RwLock<Option<ReloadHook>>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct StoreInner {
    /// Token ID → secrets
    tokens: BTreeMap<String, Vec<String>>,

    /// Secret → token ID
    secrets: HashMap<String, String>,
}

impl StoreInner {
    fn resolve(&self, token: &str) -> Option<&str> {
        if let Some((id, _)) = self.tokens.get_key_value(token) {
            return Some(id.as_str());
        }
        self.secrets.get(token).map(String::as_str)
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("tokens", &self.len())
            .field("reload_hook", &self.reload_hook.read().is_some())
            .finish()
    }
}

impl TokenStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            reload_hook: RwLock::new(None),
        }
    }

    /// Load tokens from a file
    ///
    /// File format:
    /// ```text
    /// # comments start with #
    /// token_id:secret1,secret2
    /// token_without_secrets
    /// ```
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid entries.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = read_tokens_file(path.as_ref())?;
        Self::from_str(&contents)
    }

    /// Register the callback fired when a reload changes the token set
    pub fn set_reload_hook(&self, hook: ReloadHook) {
        *self.reload_hook.write() = Some(hook);
    }

    /// Insert a token with its secrets
    ///
    /// Replaces the secrets of an existing token.
    pub fn insert<I, S>(&self, id: impl Into<String>, secrets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let secrets: Vec<String> = secrets.into_iter().map(Into::into).collect();

        let mut inner = self.inner.write();
        if let Some(old) = inner.tokens.remove(&id) {
            for secret in old {
                inner.secrets.remove(&secret);
            }
        }
        for secret in &secrets {
            inner.secrets.insert(secret.clone(), id.clone());
        }
        inner.tokens.insert(id, secrets);
    }

    /// Check if a token ID exists
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().tokens.contains_key(id)
    }

    /// Number of token IDs in the store
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().tokens.len()
    }

    /// Check if the store is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.read().tokens.is_empty()
    }

    /// Reload tokens from a file, atomically replacing all existing tokens
    ///
    /// Returns whether the token set changed.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid entries.
    /// On error, the existing tokens are preserved.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        let contents = read_tokens_file(path.as_ref())?;
        self.reload_from_str(&contents)
    }

    /// Reload tokens from a string, atomically replacing all existing tokens
    ///
    /// Returns whether the token set changed. The reload hook fires only
    /// when it did.
    ///
    /// # Errors
    ///
    /// Returns error if string contains invalid entries.
    /// On error, the existing tokens are preserved.
    pub fn reload_from_str(&self, contents: &str) -> Result<bool> {
        // Parse first so a bad file never clobbers the live set
        let parsed = parse_tokens(contents)?;

        let changed = {
            let mut inner = self.inner.write();
            if *inner == parsed {
                false
            } else {
                *inner = parsed;
                true
            }
        };

        if changed {
            tracing::info!(tokens = self.len(), "authorization tokens reloaded");
            if let Some(hook) = self.reload_hook.read().as_ref() {
                hook();
            }
        }

        Ok(changed)
    }
}

impl FromStr for TokenStore {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self {
            inner: RwLock::new(parse_tokens(s)?),
            reload_hook: RwLock::new(None),
        })
    }
}

impl TokenResolver for TokenStore {
    fn resolve_ids(&self, tokens: &[String]) -> Vec<String> {
        let inner = self.inner.read();
        let mut seen = HashSet::with_capacity(tokens.len());
        let mut ids = Vec::with_capacity(tokens.len());

        for token in tokens {
            match inner.resolve(token) {
                Some(id) => {
                    if seen.insert(id) {
                        ids.push(id.to_string());
                    }
                }
                None => tracing::debug!(token = %token, "unknown token skipped"),
            }
        }

        ids
    }

    fn all_token_ids(&self) -> Vec<String> {
        self.inner.read().tokens.keys().cloned().collect()
    }
}

fn read_tokens_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| AuthError::io_error(path.display().to_string(), e))
}

/// Parse the tokens file format into a fresh store
fn parse_tokens(contents: &str) -> Result<StoreInner> {
    let mut inner = StoreInner::default();

    for (line_num, line) in contents.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (id, secrets) = match line.split_once(':') {
            Some((id, secrets)) => (id.trim(), secrets),
            None => (line, ""),
        };

        if id.is_empty() {
            return Err(AuthError::empty_token(line_num));
        }
        if id.contains(char::is_whitespace) {
            return Err(AuthError::parse_error(
                line_num,
                format!("token ID '{id}' contains whitespace"),
            ));
        }
        if inner.tokens.contains_key(id) {
            return Err(AuthError::duplicate_token(line_num));
        }

        let mut token_secrets = Vec::new();
        for secret in secrets.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if secret.contains(char::is_whitespace) {
                return Err(AuthError::parse_error(
                    line_num,
                    "token secret contains whitespace",
                ));
            }
            if inner.secrets.contains_key(secret) {
                return Err(AuthError::duplicate_secret(line_num));
            }
            inner.secrets.insert(secret.to_string(), id.to_string());
            token_secrets.push(secret.to_string());
        }

        inner.tokens.insert(id.to_string(), token_secrets);
    }

    Ok(inner)
}

/// Shared store using Arc for multi-threaded access
pub type SharedTokenStore = Arc<TokenStore>;
