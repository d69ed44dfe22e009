//! Local durable store facade used across the engine.
//!
//! Wraps the database repositories with the engine's degradation policy:
//! read failures are logged and fall back to the operation's default
//! (absent item, empty list, zero-valued metadata), so callers only handle
//! errors on writes, where silently losing data would corrupt the
//! queue/store invariants.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    ContentRepository, Database, LibSqlContentRepository, LibSqlStateRepository, StateRepository,
};
use crate::error::Result;
use crate::models::{CacheSnapshot, ContentId, ContentItem, SyncMetadata, SyncStatus};

/// Thread-safe handle to the local durable store.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Database>,
    metadata_gate: Arc<Mutex<()>>,
}

impl LocalStore {
    fn from_db(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            metadata_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Open a store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self::from_db(db))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_db(db))
    }

    fn items(&self) -> LibSqlContentRepository<'_> {
        LibSqlContentRepository::new(self.db.connection())
    }

    fn state(&self) -> LibSqlStateRepository<'_> {
        LibSqlStateRepository::new(self.db.connection())
    }

    /// Insert or replace a content item. Write failures propagate.
    pub async fn put_item(&self, item: &ContentItem) -> Result<()> {
        self.items().put(item).await
    }

    /// Get an item by id; storage failures degrade to `None`.
    pub async fn get_item(&self, id: &ContentId) -> Option<ContentItem> {
        match self.items().get(id).await {
            Ok(item) => item,
            Err(error) => {
                tracing::warn!("Degraded read for item {id}: {error}");
                None
            }
        }
    }

    /// Get an item by id, propagating storage failures.
    ///
    /// Used where absence must be confirmed before acting on it; the
    /// degrading [`Self::get_item`] cannot tell a missing row from a
    /// failed read.
    pub async fn try_get_item(&self, id: &ContentId) -> Result<Option<ContentItem>> {
        self.items().get(id).await
    }

    /// Physically remove an item row. Write failures propagate.
    pub async fn remove_item(&self, id: &ContentId) -> Result<()> {
        self.items().delete(id).await
    }

    /// All items, newest created first; storage failures degrade to empty.
    pub async fn list_items(&self) -> Vec<ContentItem> {
        match self.items().list_all().await {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!("Degraded read listing items: {error}");
                Vec::new()
            }
        }
    }

    /// Items with the given status; storage failures degrade to empty.
    pub async fn list_items_by_status(&self, status: SyncStatus) -> Vec<ContentItem> {
        match self.items().list_by_status(status).await {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!("Degraded read listing {} items: {error}", status.as_str());
                Vec::new()
            }
        }
    }

    /// Load the sync metadata; absence or storage failure yields a fresh
    /// zero-valued record.
    pub async fn load_metadata(&self) -> SyncMetadata {
        match self.state().load_metadata().await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => SyncMetadata::default(),
            Err(error) => {
                tracing::warn!("Degraded read of sync metadata: {error}");
                SyncMetadata::default()
            }
        }
    }

    /// Persist the sync metadata. Write failures propagate.
    ///
    /// Read-modify-write callers must go through [`Self::update_metadata`]
    /// instead; saving an independently loaded copy can overwrite a
    /// concurrent writer's queue entries.
    pub async fn save_metadata(&self, metadata: &SyncMetadata) -> Result<()> {
        self.state().save_metadata(metadata).await
    }

    /// Atomically read-modify-write the sync metadata.
    ///
    /// The gate serializes all mutations, and the record is reloaded under
    /// it, so `apply` always sees the latest persisted state.
    pub async fn update_metadata<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut SyncMetadata),
    {
        let _gate = self.metadata_gate.lock().await;
        let mut metadata = self.load_metadata().await;
        apply(&mut metadata);
        self.save_metadata(&metadata).await
    }

    /// Load the cached snapshot; failures degrade to `None`.
    pub async fn load_cache(&self) -> Option<CacheSnapshot> {
        match self.state().load_cache().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!("Degraded read of public cache: {error}");
                None
            }
        }
    }

    /// Persist the cached snapshot. Write failures propagate.
    pub async fn save_cache(&self, snapshot: &CacheSnapshot) -> Result<()> {
        self.state().save_cache(snapshot).await
    }

    /// Remove the cached snapshot. Write failures propagate.
    pub async fn clear_cache(&self) -> Result<()> {
        self.state().clear_cache().await
    }
}
