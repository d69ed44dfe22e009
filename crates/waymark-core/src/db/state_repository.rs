//! Singleton sync-state repository implementation
//!
//! Stores the per-device [`SyncMetadata`] record and the public-content
//! [`CacheSnapshot`] as JSON values under fixed keys in the `sync_state`
//! key/value table.

use crate::error::Result;
use crate::models::{CacheSnapshot, SyncMetadata};
use libsql::Connection;

/// Fixed key for the sync metadata singleton
const KEY_SYNC_METADATA: &str = "sync_metadata";
/// Fixed key for the public-content cache snapshot
const KEY_PUBLIC_CACHE: &str = "public_cache";

/// Trait for singleton state storage operations (async)
#[allow(async_fn_in_trait)]
pub trait StateRepository {
    /// Load the sync metadata record, if one has been written
    async fn load_metadata(&self) -> Result<Option<SyncMetadata>>;

    /// Persist the sync metadata record
    async fn save_metadata(&self, metadata: &SyncMetadata) -> Result<()>;

    /// Load the cached public-content snapshot, if present
    async fn load_cache(&self) -> Result<Option<CacheSnapshot>>;

    /// Persist the cached public-content snapshot
    async fn save_cache(&self, snapshot: &CacheSnapshot) -> Result<()>;

    /// Remove the cached public-content snapshot
    async fn clear_cache(&self) -> Result<()>;
}

/// libSQL implementation of `StateRepository`
pub struct LibSqlStateRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlStateRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_state WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_state (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_state WHERE key = ?", [key])
            .await?;
        Ok(())
    }
}

impl StateRepository for LibSqlStateRepository<'_> {
    async fn load_metadata(&self) -> Result<Option<SyncMetadata>> {
        match self.get_value(KEY_SYNC_METADATA).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_metadata(&self, metadata: &SyncMetadata) -> Result<()> {
        let raw = serde_json::to_string(metadata)?;
        self.set_value(KEY_SYNC_METADATA, &raw).await
    }

    async fn load_cache(&self) -> Result<Option<CacheSnapshot>> {
        match self.get_value(KEY_PUBLIC_CACHE).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_cache(&self, snapshot: &CacheSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.set_value(KEY_PUBLIC_CACHE, &raw).await
    }

    async fn clear_cache(&self) -> Result<()> {
        self.delete_value(KEY_PUBLIC_CACHE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_metadata_round_trip() {
        let db = setup().await;
        let repo = LibSqlStateRepository::new(db.connection());

        assert!(repo.load_metadata().await.unwrap().is_none());

        let mut meta = SyncMetadata {
            is_online: true,
            ..SyncMetadata::default()
        };
        meta.enqueue_upload("a".into());
        repo.save_metadata(&meta).await.unwrap();

        let loaded = repo.load_metadata().await.unwrap().unwrap();
        assert_eq!(loaded, meta);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cache_round_trip_and_clear() {
        let db = setup().await;
        let repo = LibSqlStateRepository::new(db.connection());

        let snapshot = CacheSnapshot::new(vec![], 42, std::time::Duration::from_secs(60));
        repo.save_cache(&snapshot).await.unwrap();
        assert_eq!(repo.load_cache().await.unwrap().unwrap(), snapshot);

        repo.clear_cache().await.unwrap();
        assert!(repo.load_cache().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_cache_when_absent_is_noop() {
        let db = setup().await;
        let repo = LibSqlStateRepository::new(db.connection());
        repo.clear_cache().await.unwrap();
    }
}
