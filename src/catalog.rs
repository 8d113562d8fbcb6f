//! Catalog snapshot holder with time-gated refresh

use crate::types::CatalogSnapshot;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// Trait for pluggable catalog sources.
///
/// Implementations absorb their own failures: a sub-list that cannot be
/// fetched comes back empty instead of failing the whole snapshot.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> CatalogSnapshot;
}

/// Fixed in-memory catalog for tests and offline runs
pub struct StaticCatalog {
    snapshot: CatalogSnapshot,
}

impl StaticCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self) -> CatalogSnapshot {
        let mut snapshot = self.snapshot.clone();
        snapshot.fetched_at = std::time::SystemTime::now();
        snapshot
    }
}

/// Holds the latest snapshot and swaps it as a whole when stale.
///
/// Readers get an `Arc` to the snapshot current at call time, so a refresh
/// never changes data under a request already in flight.
pub struct CatalogCache {
    source: Option<Arc<dyn CatalogSource>>,
    ttl: Duration,
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>, ttl: Duration) -> Self {
        Self {
            source: Some(source),
            ttl,
            current: RwLock::new(None),
        }
    }

    /// Cache pinned to one snapshot; never refreshes
    pub fn pinned(snapshot: CatalogSnapshot) -> Self {
        Self {
            source: None,
            ttl: Duration::MAX,
            current: RwLock::new(Some(Arc::new(snapshot))),
        }
    }

    /// Current snapshot, refreshing first when missing or older than the TTL.
    ///
    /// Concurrent callers that all observe staleness may each refresh; the
    /// last replacement wins and every one of them is a complete snapshot.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let existing = self.read_current();

        if let Some(ref snapshot) = existing {
            if !self.is_stale(snapshot) {
                return snapshot.clone();
            }
        }

        match self.source {
            Some(ref source) => self.refresh_from(source.as_ref()).await,
            None => existing.unwrap_or_else(|| Arc::new(CatalogSnapshot::empty())),
        }
    }

    /// Unconditionally fetch and replace the snapshot
    pub async fn refresh(&self) -> Arc<CatalogSnapshot> {
        match self.source {
            Some(ref source) => self.refresh_from(source.as_ref()).await,
            None => self
                .read_current()
                .unwrap_or_else(|| Arc::new(CatalogSnapshot::empty())),
        }
    }

    /// Snapshot currently held, without triggering a refresh
    pub fn peek(&self) -> Option<Arc<CatalogSnapshot>> {
        self.read_current()
    }

    async fn refresh_from(&self, source: &dyn CatalogSource) -> Arc<CatalogSnapshot> {
        debug!("Refreshing catalog from source '{}'", source.name());
        let fresh = Arc::new(source.fetch().await);

        info!(
            "Catalog refreshed: {} products, {} categories, {} brands",
            fresh.products.len(),
            fresh.categories.len(),
            fresh.brands.len()
        );

        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(fresh.clone());
        fresh
    }

    fn read_current(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn is_stale(&self, snapshot: &CatalogSnapshot) -> bool {
        match snapshot.fetched_at.elapsed() {
            Ok(age) => age >= self.ttl,
            // Clock moved backwards; treat as fresh
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Product};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch(&self) -> CatalogSnapshot {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let categories = (0..n)
                .map(|i| Category { id: format!("c{}", i), name: format!("Cat {}", i) })
                .collect();
            CatalogSnapshot::new(vec![], categories, vec![])
        }
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_reused() {
        let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
        let cache = CatalogCache::new(source.clone(), Duration::from_secs(60));

        let first = cache.snapshot().await;
        let second = cache.snapshot().await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_replaced_whole() {
        let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
        let cache = CatalogCache::new(source.clone(), Duration::ZERO);

        let first = cache.snapshot().await;
        let second = cache.snapshot().await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        // The earlier handle keeps its own data
        assert_eq!(first.categories.len(), 1);
        assert_eq!(second.categories.len(), 2);
    }

    #[tokio::test]
    async fn test_pinned_cache_never_refreshes() {
        let product = Product {
            id: "p1".to_string(),
            title: "Phone".to_string(),
            description: String::new(),
            price: Some(100.0),
            price_after_discount: None,
            category: None,
            brand: None,
            sold: 0,
            rating_average: 0.0,
            rating_count: 0,
            image_cover: None,
        };
        let cache = CatalogCache::pinned(CatalogSnapshot::new(vec![product], vec![], vec![]));

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.products.len(), 1);
        assert!(cache.peek().is_some());
    }
}
