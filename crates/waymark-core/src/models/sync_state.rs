//! Sync metadata and the pending-operation queue

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ContentId;

/// Singleton per-device sync bookkeeping record.
///
/// The two id sets form the pending-operation queue: content awaiting upload
/// or deletion reconciliation with the remote service. Persisted as a whole
/// under a fixed key, so every queue mutation is durable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetadata {
    /// Completion timestamp of the last sync cycle (Unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<i64>,
    /// Ids awaiting upload
    #[serde(default)]
    pub pending_uploads: BTreeSet<ContentId>,
    /// Ids awaiting remote deletion
    #[serde(default)]
    pub pending_deletions: BTreeSet<ContentId>,
    /// Last observed reachability
    #[serde(default)]
    pub is_online: bool,
}

impl SyncMetadata {
    /// Queue an id for upload. Idempotent.
    pub fn enqueue_upload(&mut self, id: ContentId) {
        self.pending_uploads.insert(id);
    }

    /// Queue an id for deletion. Idempotent.
    ///
    /// Removes the id from the uploads set: a deletion always supersedes a
    /// pending upload for the same id, uploading first would be wasted work.
    pub fn enqueue_deletion(&mut self, id: ContentId) {
        self.pending_uploads.remove(&id);
        self.pending_deletions.insert(id);
    }

    /// Remove an id from both sets once its operation is confirmed or
    /// explicitly abandoned
    pub fn clear(&mut self, id: &ContentId) {
        self.pending_uploads.remove(id);
        self.pending_deletions.remove(id);
    }

    /// Copy of both queues, for iteration while the record is mutated
    #[must_use]
    pub fn snapshot(&self) -> (Vec<ContentId>, Vec<ContentId>) {
        (
            self.pending_uploads.iter().cloned().collect(),
            self.pending_deletions.iter().cloned().collect(),
        )
    }

    /// Whether any operation is still queued
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending_uploads.is_empty() || !self.pending_deletions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_enqueue_upload_is_idempotent() {
        let mut meta = SyncMetadata::default();
        meta.enqueue_upload("a".into());
        meta.enqueue_upload("a".into());
        assert_eq!(meta.pending_uploads.len(), 1);
    }

    #[test]
    fn test_deletion_supersedes_pending_upload() {
        let mut meta = SyncMetadata::default();
        meta.enqueue_upload("a".into());
        meta.enqueue_deletion("a".into());
        assert!(!meta.pending_uploads.contains(&ContentId::from("a")));
        assert!(meta.pending_deletions.contains(&ContentId::from("a")));

        meta.enqueue_deletion("a".into());
        assert_eq!(meta.pending_deletions.len(), 1);
    }

    #[test]
    fn test_clear_removes_from_both_sets() {
        let mut meta = SyncMetadata::default();
        meta.enqueue_upload("a".into());
        meta.enqueue_deletion("b".into());
        meta.clear(&"a".into());
        meta.clear(&"b".into());
        assert!(!meta.has_pending());
    }

    #[test]
    fn test_serde_round_trip_preserves_queues() {
        let mut meta = SyncMetadata {
            last_sync_at: Some(1_700_000_000_000),
            is_online: true,
            ..SyncMetadata::default()
        };
        meta.enqueue_upload("x".into());
        meta.enqueue_deletion("y".into());

        let json = serde_json::to_string(&meta).unwrap();
        let back: SyncMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
