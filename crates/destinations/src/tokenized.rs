//! Token-keyed multi-maps
//!
//! The read-side projection the hot path queries: token → key → value.
//! Removing the last key of a token removes the token entry too, so no
//! empty inner map is ever left behind.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tell_sinks::{Consumer, Storage};

/// Key of a consumer entry
///
/// Stream destinations register their queue under their own name; batch
/// destinations share the token's incoming logger, registered once under
/// the token ID. Keeping the two apart means a destination named like a
/// token can't clobber the logger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConsumerKey {
    /// Dedicated queue of a stream destination
    Queue(String),
    /// Shared incoming logger of a token
    Logger(String),
}

impl fmt::Display for ConsumerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue(name) => write!(f, "queue:{name}"),
            Self::Logger(token) => write!(f, "logger:{token}"),
        }
    }
}

/// token → key → value
pub struct Tokenized<K, V> {
    by_token: HashMap<String, HashMap<K, V>>,
}

/// token → consumer key → consumer
pub type TokenizedConsumers = Tokenized<ConsumerKey, Arc<dyn Consumer>>;

/// token → destination name → storage (batch destinations only)
pub type TokenizedStorages = Tokenized<String, Arc<dyn Storage>>;

/// token → set of destination names
pub type TokenizedIds = Tokenized<String, ()>;

impl<K, V> Default for Tokenized<K, V> {
    fn default() -> Self {
        Self {
            by_token: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> Tokenized<K, V> {
    /// Insert or replace an entry
    pub fn add(&mut self, token: &str, key: K, value: V) {
        self.by_token
            .entry(token.to_string())
            .or_default()
            .insert(key, value);
    }

    /// Remove an entry, dropping the token once it has no entries left
    pub fn remove<Q>(&mut self, token: &str, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let entries = self.by_token.get_mut(token)?;
        let removed = entries.remove(key);
        if entries.is_empty() {
            self.by_token.remove(token);
        }
        removed
    }

    /// Add every entry of `other`, replacing on conflicts
    pub fn merge(&mut self, other: Self) {
        for (token, entries) in other.by_token {
            self.by_token.entry(token).or_default().extend(entries);
        }
    }

    /// Look up one entry
    pub fn get<Q>(&self, token: &str, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.by_token.get(token)?.get(key)
    }

    /// Check if the token has any entries
    pub fn contains_token(&self, token: &str) -> bool {
        self.by_token.contains_key(token)
    }

    /// Number of entries under a token
    pub fn len(&self, token: &str) -> usize {
        self.by_token.get(token).map_or(0, HashMap::len)
    }

    /// Number of tokens with entries
    pub fn token_count(&self) -> usize {
        self.by_token.len()
    }

    /// Check if no token has entries
    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.by_token.clear();
    }
}

impl<K: Eq + Hash, V: Clone> Tokenized<K, V> {
    /// Copies of a token's values
    pub fn values(&self, token: &str) -> Vec<V> {
        self.by_token
            .get(token)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl<K: Eq + Hash + Clone, V> Tokenized<K, V> {
    /// Copies of a token's keys
    pub fn keys(&self, token: &str) -> HashSet<K> {
        self.by_token
            .get(token)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Tokenized<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.by_token
                    .iter()
                    .map(|(token, entries)| (token, entries.keys().collect::<Vec<_>>())),
            )
            .finish()
    }
}
