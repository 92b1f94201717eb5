//! efq-shared: Shared types and utilities for efq crates
//!
//! This crate contains the small set of types every efq crate agrees on:
//! the ordered request parameter map, the common `Result` alias and a few
//! string helpers used by the parsers and the dispatcher.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::doc_markdown
)]

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

/// Result type alias for efq front-end operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Flat key to DSL-string map, as posted by a client or stored in a block
/// configuration. Insertion order is preserved.
pub type Params = IndexMap<String, String>;

/// Build a [`Params`] map from key-value pairs
pub fn params<K, V, I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Stable hex digest of a parameter map.
///
/// Keys are sorted before hashing so two maps with the same entries produce
/// the same digest regardless of insertion order.
pub fn stable_hash(params: &Params) -> String {
    let mut entries: Vec<(&String, &String)> = params.iter().collect();
    entries.sort();

    let mut hasher = Sha256::new();
    for (key, value) in entries {
        hasher.update(key.as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.as_bytes());
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

/// Common utility functions
pub mod utils {
    /// Check if a string is empty or whitespace-only
    #[must_use]
    pub fn is_blank(s: &str) -> bool {
        s.trim().is_empty()
    }

    /// Split `input` on `delimiter`, dropping empty pieces
    pub fn split_non_empty<'a>(input: &'a str, delimiter: &'a str) -> impl Iterator<Item = &'a str> {
        input.split(delimiter).filter(|piece| !piece.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stable_hash_ignores_insertion_order() {
        let a = params([("paged", "1-10"), ("content_type", "article")]);
        let b = params([("content_type", "article"), ("paged", "1-10")]);
        assert_eq!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn test_stable_hash_distinguishes_values() {
        let a = params([("paged", "1-10")]);
        let b = params([("paged", "2-10")]);
        assert_ne!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn test_stable_hash_does_not_merge_boundaries() {
        let a = params([("ab", "c")]);
        let b = params([("a", "bc")]);
        assert_ne!(stable_hash(&a), stable_hash(&b));
    }

    #[test]
    fn test_split_non_empty() {
        let pieces: Vec<&str> = utils::split_non_empty("10--11-", "-").collect();
        assert_eq!(pieces, vec!["10", "11"]);
        assert!(utils::is_blank("  \t"));
    }
}
