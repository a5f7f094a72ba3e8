//! Response cache collaborator for the library fetcher.
//!
//! Remote answers are cached per `(library, query)` for the lifetime of the
//! cache instance. Only successful answers are stored; a failing library is
//! asked again on the next fetch. Hosts clear the cache explicitly (e.g. a
//! "refresh" action) through [`ResponseCache::invalidate_all`].

use std::sync::Arc;

use dashmap::DashMap;

use crate::source::{ItemQuery, RawItem};

/// A cached remote answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedResponse {
    Items(Arc<Vec<RawItem>>),
    Capability(Option<String>),
}

/// Cache contract injected into the fetcher.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedResponse>;
    fn put(&self, key: String, value: CachedResponse);
    fn invalidate_all(&self);
}

/// Cache key for an item query.
pub fn items_key(group: &str, library_id: &str, query: &ItemQuery) -> String {
    format!("items:{group}:{library_id}:{}", query.fingerprint())
}

/// Cache key for a capability lookup.
pub fn capability_key(group: &str, library_id: &str) -> String {
    format!("capability:{group}:{library_id}")
}

/// Concurrent in-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CachedResponse>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<CachedResponse> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: String, value: CachedResponse) {
        self.entries.insert(key, value);
    }

    fn invalidate_all(&self) {
        self.entries.clear();
    }
}

/// A cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl ResponseCache for NoCache {
    fn get(&self, _key: &str) -> Option<CachedResponse> {
        None
    }

    fn put(&self, _key: String, _value: CachedResponse) {}

    fn invalidate_all(&self) {}
}
