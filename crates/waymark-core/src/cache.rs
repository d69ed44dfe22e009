//! Time-boxed cache of nearby public content for offline browsing.

use std::time::Duration;

use crate::error::Result;
use crate::models::{CacheSnapshot, ContentItem, DEFAULT_PUBLIC_CACHE_MAX_AGE};
use crate::store::LocalStore;
use crate::util::now_ms;

/// Public-content cache over the local store.
///
/// Snapshots are replaced wholesale on every successful download; this is
/// disposable read-through data, not user-owned state, so there is no
/// per-item merging.
#[derive(Clone)]
pub struct ContentCache {
    store: LocalStore,
    max_age: Duration,
}

impl ContentCache {
    /// Create a cache with the default 24 hour snapshot lifetime
    #[must_use]
    pub fn new(store: LocalStore) -> Self {
        Self::with_max_age(store, DEFAULT_PUBLIC_CACHE_MAX_AGE)
    }

    /// Create a cache with a custom snapshot lifetime
    #[must_use]
    pub const fn with_max_age(store: LocalStore, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    /// Replace the snapshot wholesale, stamping the current time
    pub async fn save(&self, items: Vec<ContentItem>) -> Result<()> {
        let snapshot = CacheSnapshot::new(items, now_ms(), self.max_age);
        self.store.save_cache(&snapshot).await
    }

    /// Cached items if the snapshot is still valid.
    ///
    /// An expired snapshot is purged from storage and read as empty.
    pub async fn read(&self) -> Vec<ContentItem> {
        let Some(snapshot) = self.store.load_cache().await else {
            return Vec::new();
        };

        if snapshot.is_valid(now_ms()) {
            return snapshot.items;
        }

        tracing::debug!(
            "Purging expired public cache (captured at {})",
            snapshot.captured_at
        );
        if let Err(error) = self.store.clear_cache().await {
            tracing::warn!("Failed to purge expired public cache: {error}");
        }
        Vec::new()
    }

    /// Whether a valid, non-empty snapshot is present.
    ///
    /// An empty cache is indistinguishable from an expired one; accepted
    /// limitation.
    pub async fn is_valid(&self) -> bool {
        !self.read().await.is_empty()
    }

    /// Drop the snapshot regardless of validity
    pub async fn clear(&self) -> Result<()> {
        self.store.clear_cache().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, ContentPayload, GeoPosition, NewContent};
    use pretty_assertions::assert_eq;

    fn public_item(title: &str) -> ContentItem {
        ContentItem::new_local(
            "other-user",
            NewContent {
                title: title.to_string(),
                description: None,
                payload: ContentPayload::Marker,
                position: GeoPosition::new(48.2, 16.4),
                is_public: true,
            },
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_and_read() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let cache = ContentCache::new(store);

        assert!(!cache.is_valid().await);

        cache.save(vec![public_item("Statue")]).await.unwrap();
        let items = cache.read().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Statue");
        assert!(cache.is_valid().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expired_snapshot_reads_empty_and_is_purged() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let cache = ContentCache::with_max_age(store.clone(), Duration::ZERO);

        // Backdate the snapshot so the zero max-age window has passed
        let snapshot = CacheSnapshot::new(vec![public_item("Old")], now_ms() - 10, Duration::ZERO);
        store.save_cache(&snapshot).await.unwrap();

        assert!(cache.read().await.is_empty());
        // Purged from storage, not just filtered
        assert!(store.load_cache().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let cache = ContentCache::new(store);

        cache.save(vec![public_item("Statue")]).await.unwrap();
        cache.clear().await.unwrap();
        assert!(cache.read().await.is_empty());
    }
}
