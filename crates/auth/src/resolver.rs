//! Token resolution trait

/// Maps configured tokens to concrete token IDs
///
/// Implemented by [`TokenStore`](crate::TokenStore); the destinations
/// service only depends on this trait.
pub trait TokenResolver: Send + Sync {
    /// Resolve tokens (IDs or secrets) to token IDs
    ///
    /// Unknown tokens are dropped. The result has no duplicates and keeps
    /// the order of first appearance.
    fn resolve_ids(&self, tokens: &[String]) -> Vec<String>;

    /// All known token IDs, sorted
    fn all_token_ids(&self) -> Vec<String>;
}
