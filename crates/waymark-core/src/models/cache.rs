//! Cached public content snapshot model

use serde::{Deserialize, Serialize};

use super::ContentItem;

/// Default lifetime of a cached public-content snapshot: 24 hours.
pub const DEFAULT_PUBLIC_CACHE_MAX_AGE: std::time::Duration =
    std::time::Duration::from_secs(24 * 60 * 60);

/// A time-boxed wholesale copy of nearby public content for offline browsing.
///
/// Replaced as a unit on every successful download; an expired snapshot is
/// treated as empty and purged on the next read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Cached items, in the order the remote returned them
    pub items: Vec<ContentItem>,
    /// Capture timestamp (Unix ms)
    pub captured_at: i64,
    /// Maximum age before the snapshot expires, in milliseconds
    pub max_age_ms: i64,
}

impl CacheSnapshot {
    /// Build a snapshot captured at `now`
    #[must_use]
    pub fn new(items: Vec<ContentItem>, captured_at: i64, max_age: std::time::Duration) -> Self {
        Self {
            items,
            captured_at,
            max_age_ms: i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Valid iff `now - captured_at <= max_age_ms`
    #[must_use]
    pub const fn is_valid(&self, now: i64) -> bool {
        now - self.captured_at <= self.max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_within_max_age_is_valid() {
        let snap = CacheSnapshot::new(vec![], 1_000, std::time::Duration::from_millis(500));
        assert!(snap.is_valid(1_000));
        assert!(snap.is_valid(1_500));
        assert!(!snap.is_valid(1_501));
    }

    #[test]
    fn test_default_max_age_is_twenty_four_hours() {
        assert_eq!(DEFAULT_PUBLIC_CACHE_MAX_AGE.as_secs(), 86_400);
    }
}
