//! Offline-first sync orchestrator.
//!
//! [`SyncEngine`] sequences upload, download, and merge under a
//! single-flight guarantee: at most one cycle runs at a time, concurrent
//! attempts are rejected, not queued. Local mutations write through the
//! durable store and enqueue pending operations; reconnects and local
//! creates opportunistically fire background cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::ContentCache;
use crate::error::{Error, Result};
use crate::models::{
    ContentFields, ContentId, ContentItem, GeoPosition, NewContent, SyncStatus,
};
use crate::remote::{IdentityProvider, RemoteContentService};
use crate::store::LocalStore;
use crate::util::now_ms;

/// Sentinel error when a sync is attempted while offline
pub const SYNC_REJECTED_OFFLINE: &str = "Sync rejected: device is offline";
/// Sentinel error when a sync is attempted while another cycle is running
pub const SYNC_REJECTED_BUSY: &str = "Sync rejected: a sync cycle is already running";

/// Default radius for nearby public content queries
const DEFAULT_NEARBY_RADIUS_KM: f64 = 10.0;

/// Outcome of one sync cycle.
///
/// `sync()` always returns a result, never an error, so callers can render
/// partial success. `success` is true iff `errors` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub success: bool,
    pub uploaded: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl SyncResult {
    fn rejected(reason: &str) -> Self {
        Self {
            errors: vec![reason.to_string()],
            ..Self::default()
        }
    }
}

/// Current engine state over both axes: connectivity and sync activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus {
    pub is_online: bool,
    pub is_syncing: bool,
}

/// Resets the single-flight flag on every exit path, including panics
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct EngineInner {
    store: LocalStore,
    cache: ContentCache,
    remote: Arc<dyn RemoteContentService>,
    identity: Arc<dyn IdentityProvider>,
    is_syncing: AtomicBool,
    is_online: AtomicBool,
    last_location: Mutex<Option<GeoPosition>>,
    nearby_radius_km: f64,
}

/// Single-flight coordinator for offline-first content synchronization.
///
/// Cheap to clone; clones share state. Construct once per device and pass
/// the handle to callers instead of relying on process-wide singletons.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    /// Create an engine over the given store and collaborators, restoring
    /// the last observed reachability from persisted metadata.
    pub async fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteContentService>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let is_online = store.load_metadata().await.is_online;
        let cache = ContentCache::new(store.clone());
        Self {
            inner: Arc::new(EngineInner {
                store,
                cache,
                remote,
                identity,
                is_syncing: AtomicBool::new(false),
                is_online: AtomicBool::new(is_online),
                last_location: Mutex::new(None),
                nearby_radius_km: DEFAULT_NEARBY_RADIUS_KM,
            }),
        }
    }

    /// The content cache backing offline browsing of public items
    #[must_use]
    pub fn cache(&self) -> &ContentCache {
        &self.inner.cache
    }

    /// The local durable store
    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    /// Current connectivity and activity flags
    #[must_use]
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            is_online: self.inner.is_online.load(Ordering::SeqCst),
            is_syncing: self.inner.is_syncing.load(Ordering::SeqCst),
        }
    }

    /// Record the device's last known location for nearby-content queries
    pub fn update_location(&self, position: GeoPosition) {
        if let Ok(mut guard) = self.inner.last_location.lock() {
            *guard = Some(position);
        }
    }

    /// Update the reachability flag and persist it, without triggering a sync
    pub async fn set_online(&self, online: bool) -> bool {
        let was_online = self.inner.is_online.swap(online, Ordering::SeqCst);

        let persisted = self
            .inner
            .store
            .update_metadata(|metadata| metadata.is_online = online)
            .await;
        if let Err(error) = persisted {
            // Reachability bookkeeping; nobody is waiting on this write
            tracing::warn!("Failed to persist reachability flag: {error}");
        }

        was_online
    }

    /// React to a connectivity transition: persist the flag and, on
    /// offline-to-online, fire an automatic background sync
    pub async fn handle_connectivity(&self, online: bool) {
        let was_online = self.set_online(online).await;

        if online && !was_online {
            tracing::info!("Connectivity restored, starting automatic sync");
            self.spawn_sync("reconnect");
        }
    }

    /// Fire-and-forget background sync; failures are logged, never surfaced
    fn spawn_sync(&self, reason: &'static str) {
        let engine = self.clone();
        tokio::spawn(async move {
            let result = engine.sync().await;
            if result.success {
                tracing::debug!("Background sync ({reason}) completed");
            } else {
                tracing::warn!(
                    "Background sync ({reason}) finished with errors: {:?}",
                    result.errors
                );
            }
        });
    }

    /// Create content locally: write it to the store, queue an upload, and
    /// opportunistically sync when online.
    pub async fn create_local(&self, draft: NewContent) -> Result<ContentItem> {
        let owner_id = self
            .inner
            .identity
            .current_user_id()
            .ok_or(Error::NotAuthenticated)?;

        let item = ContentItem::new_local(owner_id, draft);
        self.inner.store.put_item(&item).await?;
        self.inner
            .store
            .update_metadata(|metadata| metadata.enqueue_upload(item.id.clone()))
            .await?;

        tracing::debug!("Created local item {} ({:?})", item.id, item.kind());
        if self.status().is_online {
            self.spawn_sync("local create");
        }

        Ok(item)
    }

    /// Edit content locally, re-queueing it for upload.
    pub async fn update_local(&self, id: &ContentId, fields: ContentFields) -> Result<ContentItem> {
        if self.inner.identity.current_user_id().is_none() {
            return Err(Error::NotAuthenticated);
        }

        let mut item = self
            .inner
            .store
            .get_item(id)
            .await
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        item.apply_fields(fields);
        self.inner.store.put_item(&item).await?;
        self.inner
            .store
            .update_metadata(|metadata| metadata.enqueue_upload(item.id.clone()))
            .await?;

        if self.status().is_online {
            self.spawn_sync("local edit");
        }

        Ok(item)
    }

    /// Delete content locally: queue the deletion (superseding any pending
    /// upload), tombstone the row, and attempt the remote deletion in the
    /// background when online. The row is purged only once the remote
    /// deletion is confirmed.
    pub async fn delete_local(&self, id: &ContentId) -> Result<()> {
        if self.inner.identity.current_user_id().is_none() {
            return Err(Error::NotAuthenticated);
        }

        // Tombstone: excluded from active views, kept for retry bookkeeping.
        // Bumping updated_at keeps the merge from resurrecting the row from
        // a stale remote copy.
        if let Some(mut item) = self.inner.store.get_item(id).await {
            item.sync_status = SyncStatus::Failed;
            item.updated_at = now_ms();
            self.inner.store.put_item(&item).await?;
        }

        self.inner
            .store
            .update_metadata(|metadata| metadata.enqueue_deletion(id.clone()))
            .await?;

        tracing::debug!("Queued deletion of {id}");
        if self.status().is_online {
            self.spawn_sync("local delete");
        }

        Ok(())
    }

    /// Union of the user's non-tombstoned local content and cached public
    /// content. Local copies win over cached duplicates.
    pub async fn list_available(&self) -> Vec<ContentItem> {
        let metadata = self.inner.store.load_metadata().await;

        let mut items: Vec<ContentItem> = self
            .inner
            .store
            .list_items()
            .await
            .into_iter()
            .filter(|item| !metadata.pending_deletions.contains(&item.id))
            .collect();

        let seen: std::collections::HashSet<ContentId> =
            items.iter().map(|item| item.id.clone()).collect();
        for cached in self.inner.cache.read().await {
            if !seen.contains(&cached.id) {
                items.push(cached);
            }
        }

        items
    }

    /// Clear sync metadata (queues and last-sync stamp) without touching
    /// content rows. Troubleshooting hatch.
    pub async fn reset(&self) -> Result<()> {
        self.inner
            .store
            .update_metadata(|metadata| {
                metadata.pending_uploads.clear();
                metadata.pending_deletions.clear();
                metadata.last_sync_at = None;
            })
            .await
    }

    /// Run one sync cycle: upload pending changes, download remote state,
    /// merge last-writer-wins, refresh the public cache, stamp the metadata.
    ///
    /// Admission is rejected with a sentinel error (and no side effects)
    /// when the device is offline or a cycle is already running.
    pub async fn sync(&self) -> SyncResult {
        if !self.status().is_online {
            return SyncResult::rejected(SYNC_REJECTED_OFFLINE);
        }

        let Some(_guard) = SyncGuard::acquire(&self.inner.is_syncing) else {
            return SyncResult::rejected(SYNC_REJECTED_BUSY);
        };

        let mut result = SyncResult::default();
        self.upload_phase(&mut result).await;
        self.download_phase(&mut result).await;
        self.finalize(&mut result).await;

        tracing::info!(
            "Sync cycle done: uploaded={} downloaded={} failed={}",
            result.uploaded,
            result.downloaded,
            result.failed
        );
        result
    }

    /// Phase 1: drain pending uploads and deletions. One item's failure
    /// never aborts the batch; failed ids stay queued for the next cycle.
    ///
    /// The queues are snapshotted once, but each confirmation is cleared
    /// against freshly loaded metadata, so entries enqueued while the cycle
    /// runs are never overwritten.
    async fn upload_phase(&self, result: &mut SyncResult) {
        let (uploads, deletions) = self.inner.store.load_metadata().await.snapshot();

        for id in uploads {
            match self.inner.store.try_get_item(&id).await {
                Ok(Some(item)) => match self.push_item(&item).await {
                    Ok(()) => {
                        self.clear_queue_entry(&id, result).await;
                        result.uploaded += 1;
                    }
                    Err(error) => {
                        self.mark_failed(&item).await;
                        result.failed += 1;
                        result.errors.push(format!("upload {id}: {error}"));
                    }
                },
                Ok(None) => {
                    // Confirmed absent; drop the stale queue entry
                    tracing::warn!("Pending upload {id} has no local row, clearing");
                    self.clear_queue_entry(&id, result).await;
                }
                Err(error) => {
                    // Unreadable is not absent; the entry stays queued
                    result.failed += 1;
                    result.errors.push(format!("upload {id}: {error}"));
                }
            }
        }

        for id in deletions {
            match self.push_deletion(&id).await {
                Ok(()) => {
                    self.clear_queue_entry(&id, result).await;
                    result.uploaded += 1;
                }
                Err(error) => {
                    result.failed += 1;
                    result.errors.push(format!("delete {id}: {error}"));
                }
            }
        }
    }

    /// Drop one confirmed id from the pending queues.
    async fn clear_queue_entry(&self, id: &ContentId, result: &mut SyncResult) {
        let cleared = self
            .inner
            .store
            .update_metadata(|metadata| metadata.clear(id))
            .await;
        if let Err(error) = cleared {
            result.errors.push(format!("queue persistence: {error}"));
        }
    }

    /// Push one local item: create for locally assigned ids (remapping the
    /// row to the remote-assigned id on success), update otherwise.
    async fn push_item(&self, item: &ContentItem) -> Result<()> {
        let mut confirmed = if item.id.is_local() {
            self.inner.remote.create_item(item).await?
        } else {
            self.inner.remote.update_item(&item.id, item).await?
        };
        confirmed.sync_status = SyncStatus::Synced;

        self.inner.store.put_item(&confirmed).await?;
        if confirmed.id != item.id {
            tracing::debug!("Remapped {} to remote id {}", item.id, confirmed.id);
            self.inner.store.remove_item(&item.id).await?;
        }
        Ok(())
    }

    /// Confirm one queued deletion remotely and purge the tombstone row.
    /// Ids that never reached the remote are confirmed locally.
    async fn push_deletion(&self, id: &ContentId) -> Result<()> {
        if !id.is_local() {
            self.inner.remote.delete_item(id).await?;
        }
        match self.inner.store.remove_item(id).await {
            Ok(()) | Err(Error::NotFound(_)) => Ok(()),
            Err(error) => Err(error),
        }
    }

    async fn mark_failed(&self, item: &ContentItem) {
        let mut failed = item.clone();
        failed.sync_status = SyncStatus::Failed;
        if let Err(error) = self.inner.store.put_item(&failed).await {
            tracing::warn!("Failed to mark {} as failed: {error}", item.id);
        }
    }

    /// Phase 2: pull the user's remote content and merge it last-writer-wins,
    /// then replace the public cache with nearby content (skipped without a
    /// known location).
    async fn download_phase(&self, result: &mut SyncResult) {
        match self.inner.remote.list_user_items().await {
            Ok(remote_items) => {
                for remote_item in remote_items {
                    let id = remote_item.id.clone();
                    match self.merge_remote_item(remote_item).await {
                        Ok(true) => result.downloaded += 1,
                        Ok(false) => {}
                        Err(error) => {
                            result.failed += 1;
                            result.errors.push(format!("merge {id}: {error}"));
                        }
                    }
                }
            }
            Err(error) => result.errors.push(format!("download: {error}")),
        }

        let location = self
            .inner
            .last_location
            .lock()
            .map_or(None, |guard| *guard);
        let Some(position) = location else {
            tracing::debug!("No known location, skipping nearby public content");
            return;
        };

        match self
            .inner
            .remote
            .list_nearby_public_items(
                position.latitude,
                position.longitude,
                self.inner.nearby_radius_km,
            )
            .await
        {
            Ok(items) => {
                result.downloaded += items.len();
                if let Err(error) = self.inner.cache.save(items).await {
                    result.errors.push(format!("cache refresh: {error}"));
                }
            }
            Err(error) => result.errors.push(format!("nearby download: {error}")),
        }
    }

    /// Last-writer-wins merge of one remote item. The remote copy replaces
    /// the local one wholesale iff its `updated_at` is strictly greater;
    /// ties keep the local copy. Returns whether the remote copy was applied.
    async fn merge_remote_item(&self, remote_item: ContentItem) -> Result<bool> {
        let apply = match self.inner.store.get_item(&remote_item.id).await {
            None => true,
            Some(local) => remote_item.updated_at > local.updated_at,
        };

        if apply {
            let mut merged = remote_item;
            merged.sync_status = SyncStatus::Synced;
            self.inner.store.put_item(&merged).await?;
        }
        Ok(apply)
    }

    /// Phase 3: stamp the sync time. Partial progress is never rolled back;
    /// this is a best-effort converge, not a transaction.
    async fn finalize(&self, result: &mut SyncResult) {
        let stamped = self
            .inner
            .store
            .update_metadata(|metadata| metadata.last_sync_at = Some(now_ms()))
            .await;
        if let Err(error) = stamped {
            result.errors.push(format!("metadata stamp: {error}"));
        }

        result.success = result.errors.is_empty();
    }
}
