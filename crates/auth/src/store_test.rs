//! Tests for TokenStore
//!
//! Tests cover parsing, resolution, hot reload, and the reload hook.

use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{AuthError, TokenResolver, TokenStore};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Basic store tests
// =============================================================================

#[test]
fn test_new_store_is_empty() {
    let store = TokenStore::new();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
    assert!(store.all_token_ids().is_empty());
}

#[test]
fn test_insert_and_contains() {
    let store = TokenStore::new();
    store.insert("web", ["js-1", "srv-1"]);

    assert_eq!(store.len(), 1);
    assert!(store.contains("web"));
    assert!(!store.contains("js-1"));
}

#[test]
fn test_insert_replaces_secrets() {
    let store = TokenStore::new();
    store.insert("web", ["old"]);
    store.insert("web", ["new"]);

    assert_eq!(store.len(), 1);
    assert!(store.resolve_ids(&strings(&["old"])).is_empty());
    assert_eq!(store.resolve_ids(&strings(&["new"])), vec!["web"]);
}

// =============================================================================
// Parsing tests
// =============================================================================

#[test]
fn test_parse_with_comments_and_blank_lines() {
    let contents = "\
# production tokens
web:js-1,srv-1

mobile
  # indented comment
cli:cli-secret
";
    let store = TokenStore::from_str(contents).unwrap();
    assert_eq!(store.len(), 3);
    assert_eq!(store.all_token_ids(), vec!["cli", "mobile", "web"]);
}

#[test]
fn test_parse_empty_id() {
    let err = TokenStore::from_str("web\n:secret").unwrap_err();
    assert!(matches!(err, AuthError::EmptyToken { line: 2 }));
}

#[test]
fn test_parse_duplicate_id() {
    let err = TokenStore::from_str("web\nmobile\nweb:s").unwrap_err();
    assert!(matches!(err, AuthError::DuplicateToken { line: 3 }));
}

#[test]
fn test_parse_duplicate_secret() {
    let err = TokenStore::from_str("web:shared\nmobile:shared").unwrap_err();
    assert!(matches!(err, AuthError::DuplicateSecret { line: 2 }));
}

#[test]
fn test_parse_whitespace_in_id() {
    let err = TokenStore::from_str("my token:secret").unwrap_err();
    assert!(matches!(err, AuthError::ParseError { line: 1, .. }));
}

#[test]
fn test_parse_skips_empty_secrets() {
    let store = TokenStore::from_str("web:a,,b,").unwrap();
    assert_eq!(store.resolve_ids(&strings(&["a", "b"])), vec!["web"]);
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "web:js-1").unwrap();
    writeln!(file, "mobile").unwrap();

    let store = TokenStore::from_file(file.path()).unwrap();
    assert_eq!(store.len(), 2);
}

#[test]
fn test_from_missing_file() {
    let err = TokenStore::from_file("/nonexistent/tokens.conf").unwrap_err();
    assert!(matches!(err, AuthError::IoError { .. }));
}

// =============================================================================
// Resolution tests
// =============================================================================

#[test]
fn test_resolve_ids_and_secrets() {
    let store = TokenStore::from_str("web:js-1,srv-1\nmobile").unwrap();

    assert_eq!(store.resolve_ids(&strings(&["web"])), vec!["web"]);
    assert_eq!(store.resolve_ids(&strings(&["srv-1"])), vec!["web"]);
    assert_eq!(
        store.resolve_ids(&strings(&["mobile", "js-1"])),
        vec!["mobile", "web"]
    );
}

#[test]
fn test_resolve_deduplicates() {
    let store = TokenStore::from_str("web:js-1,srv-1").unwrap();
    let ids = store.resolve_ids(&strings(&["js-1", "web", "srv-1"]));
    assert_eq!(ids, vec!["web"]);
}

#[test]
fn test_resolve_drops_unknown() {
    let store = TokenStore::from_str("web").unwrap();
    assert!(store.resolve_ids(&strings(&["ghost"])).is_empty());
    assert_eq!(store.resolve_ids(&strings(&["ghost", "web"])), vec!["web"]);
}

#[test]
fn test_resolver_as_trait_object() {
    let store: Arc<dyn TokenResolver> = Arc::new(TokenStore::from_str("b\na").unwrap());
    assert_eq!(store.all_token_ids(), vec!["a", "b"]);
}

// =============================================================================
// Hot reload tests
// =============================================================================

#[test]
fn test_reload_replaces_tokens() {
    let store = TokenStore::from_str("web").unwrap();

    let changed = store.reload_from_str("mobile:m-1").unwrap();
    assert!(changed);
    assert!(!store.contains("web"));
    assert_eq!(store.resolve_ids(&strings(&["m-1"])), vec!["mobile"]);
}

#[test]
fn test_reload_error_preserves_tokens() {
    let store = TokenStore::from_str("web:js-1").unwrap();

    let result = store.reload_from_str("a:dup\nb:dup");
    assert!(result.is_err());
    assert!(store.contains("web"));
    assert_eq!(store.resolve_ids(&strings(&["js-1"])), vec!["web"]);
}

#[test]
fn test_reload_hook_fires_on_change_only() {
    let store = TokenStore::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    store.set_reload_hook(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(store.reload_from_str("web").unwrap());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Same content, no change
    assert!(!store.reload_from_str("# same\nweb").unwrap());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    assert!(store.reload_from_str("web:new-secret").unwrap());
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn test_reload_hook_not_fired_on_error() {
    let store = TokenStore::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    store.set_reload_hook(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(store.reload_from_str("web\nweb").is_err());
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_reload_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "cli").unwrap();

    let store = TokenStore::new();
    assert!(store.reload(file.path()).unwrap());
    assert_eq!(store.all_token_ids(), vec!["cli"]);
}

#[test]
fn test_concurrent_resolve_during_reload() {
    let store = Arc::new(TokenStore::from_str("web").unwrap());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let ids = store.all_token_ids();
                    assert!(ids == vec!["web"] || ids == vec!["mobile"]);
                }
            })
        })
        .collect();

    for i in 0..100 {
        let contents = if i % 2 == 0 { "mobile" } else { "web" };
        store.reload_from_str(contents).unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_debug_output() {
    let store = TokenStore::from_str("web").unwrap();
    let debug = format!("{store:?}");
    assert!(debug.contains("TokenStore"));
    assert!(debug.contains("tokens"));
}
