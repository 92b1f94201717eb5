//! Response cache collaborator
//!
//! Keys are [`efq_shared::stable_hash`] digests of the request parameters.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::api::Response;

/// Default number of cached responses
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Storage for finished responses
pub trait ResponseCache {
    /// Cached response for `key`, if present and fresh
    fn get(&mut self, key: &str) -> Option<Response>;

    /// Store `response` under `key` for `ttl`
    fn set(&mut self, key: &str, response: Response, ttl: Duration);
}

/// In-memory LRU cache with a per-entry time to live
pub struct LruResponseCache {
    entries: LruCache<String, (Instant, Response)>,
    hits: usize,
    misses: usize,
}

impl LruResponseCache {
    /// Cache holding at most `capacity` responses
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Number of cached responses, fresh or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit and miss counters
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for LruResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResponseCache for LruResponseCache {
    fn get(&mut self, key: &str) -> Option<Response> {
        let expired = match self.entries.get(key) {
            Some((expires, response)) if *expires > Instant::now() => {
                self.hits += 1;
                return Some(response.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.pop(key);
        }
        self.misses += 1;
        None
    }

    fn set(&mut self, key: &str, response: Response, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let expires = Instant::now() + ttl;
        self.entries.put(key.to_string(), (expires, response));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_and_set() {
        let mut cache = LruResponseCache::new(2);
        assert_eq!(cache.get("a"), None);
        cache.set("a", Response::NoResults, Duration::from_secs(60));
        assert_eq!(cache.get("a"), Some(Response::NoResults));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_least_recently_used_entry_is_evicted() {
        let mut cache = LruResponseCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", Response::NoResults, ttl);
        cache.set("b", Response::InvalidDate, ttl);
        assert!(cache.get("a").is_some());
        cache.set("c", Response::EmptyBlock, ttl);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let mut cache = LruResponseCache::default();
        cache.set("a", Response::NoResults, Duration::from_nanos(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());

        cache.set("b", Response::NoResults, Duration::ZERO);
        assert!(cache.is_empty());
    }
}
