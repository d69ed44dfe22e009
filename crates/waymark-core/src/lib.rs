//! waymark-core - Core library for Waymark
//!
//! Offline-first synchronization engine for geolocated content: the durable
//! local store, the pending-operation queue, last-writer-wins merging, the
//! public-content cache, and the single-flight sync orchestrator.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod net;
pub mod remote;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{ContentId, ContentItem, ContentKind, ContentPayload, GeoPosition, SyncStatus};
pub use sync::{SyncEngine, SyncResult};
