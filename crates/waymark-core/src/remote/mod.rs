//! Remote content service seam.
//!
//! The engine talks to the backend exclusively through
//! [`RemoteContentService`]; the reqwest implementation lives in
//! [`http`], tests substitute a mock.

mod http;

pub use http::HttpContentService;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ContentId, ContentItem};

/// Remote CRUD operations for content items.
///
/// All calls are scoped to the currently authenticated identity. Calls are
/// bounded, fail-fast I/O; failures surface as [`crate::Error::Remote`].
#[async_trait]
pub trait RemoteContentService: Send + Sync {
    /// Create an item remotely. The returned copy carries the
    /// remote-assigned id.
    async fn create_item(&self, item: &ContentItem) -> Result<ContentItem>;

    /// List the authenticated user's items.
    async fn list_user_items(&self) -> Result<Vec<ContentItem>>;

    /// List public items within `radius_km` of the given coordinates.
    async fn list_nearby_public_items(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<ContentItem>>;

    /// Replace an existing remote item.
    async fn update_item(&self, id: &ContentId, item: &ContentItem) -> Result<ContentItem>;

    /// Delete a remote item.
    async fn delete_item(&self, id: &ContentId) -> Result<()>;
}

/// Source of the current authenticated identity.
///
/// Supplied by the external auth collaborator; the engine only needs a
/// stable user id to stamp ownership and scope "my content" queries.
pub trait IdentityProvider: Send + Sync {
    /// Stable id of the signed-in user, or `None` when signed out
    fn current_user_id(&self) -> Option<String>;
}

/// Fixed identity, for tests and single-user CLI use
pub struct StaticIdentity(pub String);

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
