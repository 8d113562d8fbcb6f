//! Response cache used to memoize opening generation

use async_trait::async_trait;
use moka::sync::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

pub const DEFAULT_RESPONSE_CAPACITY: u64 = 1_000;

/// Opaque key/value store with per-entry expiry
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

#[derive(Debug, Clone)]
struct CachedResponse {
    text: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with
struct PerEntryTtl;

impl Expiry<String, CachedResponse> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CachedResponse, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-local cache bounded by entry count
pub struct InMemoryResponseCache {
    cache: Cache<String, CachedResponse>,
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_CAPACITY)
    }
}

impl InMemoryResponseCache {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }

    /// Number of live entries, after pending evictions are applied
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).map(|entry| entry.text)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.cache.insert(key.to_string(), CachedResponse { text: value, ttl });
    }
}
