//! Tell - Authorization
//!
//! Token store and resolver used by the destinations router.
//!
//! # Tokens
//!
//! Every token has a stable ID and any number of secrets (e.g. a browser
//! key and a server key). Destinations list the tokens they accept in
//! `only_tokens`, using either form; the resolver maps them to token IDs.
//!
//! ```text
//! # id:secret,secret
//! web:js-4f1c,srv-91ab
//! mobile
//! ```
//!
//! # Hot Reload
//!
//! `TokenStore::reload` swaps the token set atomically and fires the reload
//! hook when it changed, so dependent services can re-resolve.

mod error;
mod resolver;
mod store;

#[cfg(test)]
mod store_test;

pub use error::{AuthError, Result};
pub use resolver::TokenResolver;
pub use store::{ReloadHook, SharedTokenStore, TokenStore};
