//! Data models for Waymark

mod cache;
mod item;
mod sync_state;

pub use cache::{CacheSnapshot, DEFAULT_PUBLIC_CACHE_MAX_AGE};
pub use item::{
    ContentFields, ContentId, ContentItem, ContentKind, ContentPayload, GeoPosition, NewContent,
    SyncStatus,
};
pub use sync_state::SyncMetadata;
