//! Content item model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::util::now_ms;

/// Prefix carried by identifiers that have not yet been assigned by the
/// remote service. Rows keep such an id until their first confirmed upload.
const LOCAL_ID_PREFIX: &str = "local-";

/// A unique identifier for a content item.
///
/// Locally created items get a `local-<uuidv7>` id until the remote service
/// assigns one; remote-assigned ids are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Create a new locally generated id using UUID v7 (time-sortable)
    #[must_use]
    pub fn local() -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{}", Uuid::now_v7()))
    }

    /// Whether this id was generated locally and is still awaiting
    /// remote assignment
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    /// Get the string representation of this id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Reconciliation state of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Mutated locally, not yet confirmed by the remote service
    Pending,
    /// Confirmed round-trip with the remote service
    Synced,
    /// Upload attempt errored, or the row is a tombstone queued for deletion
    Failed,
}

impl SyncStatus {
    /// Stable storage string for the status column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "failed" => Ok(Self::Failed),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown sync status: {other}"
            ))),
        }
    }
}

/// Geographic position of a content item.
///
/// Distances use a planar approximation, not geodesic math; good enough for
/// the nearby-content radii this app works with, inaccurate near the poles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

impl GeoPosition {
    const KM_PER_DEGREE: f64 = 111.32;

    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }

    /// Planar-approximation distance in kilometers
    #[must_use]
    pub fn distance_km_to(&self, other: &Self) -> f64 {
        let dlat = (self.latitude - other.latitude) * Self::KM_PER_DEGREE;
        let dlng = (self.longitude - other.longitude)
            * Self::KM_PER_DEGREE
            * self.latitude.to_radians().cos();
        dlat.hypot(dlng)
    }
}

/// Kind discriminant for content payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Marker,
    Object,
    Text,
    Audio,
    Model,
}

/// Kind-specific payload of a content item.
///
/// Closed tagged union: each kind owns its own payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentPayload {
    /// A bare map pin; the item's title/description carry the content
    Marker,
    /// A placed 3D object
    Object { asset_url: String, scale: f64 },
    /// Free-standing text
    Text { body: String },
    /// An audio clip anchored at the position
    Audio { media_url: String, duration_ms: u64 },
    /// A full 3D model scene
    Model { asset_url: String },
}

impl ContentPayload {
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        match self {
            Self::Marker => ContentKind::Marker,
            Self::Object { .. } => ContentKind::Object,
            Self::Text { .. } => ContentKind::Text,
            Self::Audio { .. } => ContentKind::Audio,
            Self::Model { .. } => ContentKind::Model,
        }
    }
}

/// A user-created geolocated artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Globally unique identifier (see [`ContentId`])
    pub id: ContentId,
    /// Stable id of the owning user
    pub owner_id: String,
    /// Short display title
    pub title: String,
    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kind-specific payload
    pub payload: ContentPayload,
    /// Where the item is anchored
    pub position: GeoPosition,
    /// Whether the item is visible to other users
    pub is_public: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms); drives last-writer-wins merging
    pub updated_at: i64,
    /// Reconciliation state
    pub sync_status: SyncStatus,
}

/// Draft fields for locally creating a content item
#[derive(Debug, Clone, PartialEq)]
pub struct NewContent {
    pub title: String,
    pub description: Option<String>,
    pub payload: ContentPayload,
    pub position: GeoPosition,
    pub is_public: bool,
}

/// Patch applied by a local edit; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFields {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub payload: Option<ContentPayload>,
    pub position: Option<GeoPosition>,
    pub is_public: Option<bool>,
}

impl ContentItem {
    /// Create a pending local item from a draft, stamping both timestamps
    /// to now and assigning a locally generated id
    #[must_use]
    pub fn new_local(owner_id: impl Into<String>, draft: NewContent) -> Self {
        let now = now_ms();
        Self {
            id: ContentId::local(),
            owner_id: owner_id.into(),
            title: draft.title,
            description: draft.description,
            payload: draft.payload,
            position: draft.position,
            is_public: draft.is_public,
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Pending,
        }
    }

    /// Apply an edit patch, bumping `updated_at` and resetting the item
    /// to pending
    pub fn apply_fields(&mut self, fields: ContentFields) {
        if let Some(title) = fields.title {
            self.title = title;
        }
        if let Some(description) = fields.description {
            self.description = description;
        }
        if let Some(payload) = fields.payload {
            self.payload = payload;
        }
        if let Some(position) = fields.position {
            self.position = position;
        }
        if let Some(is_public) = fields.is_public {
            self.is_public = is_public;
        }
        self.updated_at = now_ms();
        self.sync_status = SyncStatus::Pending;
    }

    /// Kind discriminant of the payload
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        self.payload.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn draft() -> NewContent {
        NewContent {
            title: "Fountain".to_string(),
            description: None,
            payload: ContentPayload::Marker,
            position: GeoPosition::new(48.2082, 16.3738),
            is_public: true,
        }
    }

    #[test]
    fn test_local_ids_are_unique_and_flagged() {
        let a = ContentId::local();
        let b = ContentId::local();
        assert_ne!(a, b);
        assert!(a.is_local());
        assert!(!ContentId::from("srv-9f2").is_local());
    }

    #[test]
    fn test_new_local_is_pending_with_equal_timestamps() {
        let item = ContentItem::new_local("user-1", draft());
        assert_eq!(item.sync_status, SyncStatus::Pending);
        assert_eq!(item.created_at, item.updated_at);
        assert!(item.id.is_local());
        assert_eq!(item.kind(), ContentKind::Marker);
    }

    #[test]
    fn test_apply_fields_bumps_updated_at_and_resets_status() {
        let mut item = ContentItem::new_local("user-1", draft());
        item.sync_status = SyncStatus::Synced;
        let before = item.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));

        item.apply_fields(ContentFields {
            title: Some("Old fountain".to_string()),
            description: Some(Some("Baroque".to_string())),
            ..ContentFields::default()
        });

        assert_eq!(item.title, "Old fountain");
        assert_eq!(item.description.as_deref(), Some("Baroque"));
        assert!(item.updated_at > before);
        assert_eq!(item.sync_status, SyncStatus::Pending);
    }

    #[test]
    fn test_sync_status_round_trips_through_storage_string() {
        for status in [SyncStatus::Pending, SyncStatus::Synced, SyncStatus::Failed] {
            let parsed: SyncStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("gone".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn test_payload_serializes_with_kind_tag() {
        let json = serde_json::to_value(ContentPayload::Text {
            body: "hello".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["body"], "hello");
    }

    #[test]
    fn test_planar_distance_is_roughly_right_at_mid_latitudes() {
        // Vienna city center to Schoenbrunn, about 5 km
        let a = GeoPosition::new(48.2082, 16.3738);
        let b = GeoPosition::new(48.1845, 16.3122);
        let d = a.distance_km_to(&b);
        assert!((3.0..8.0).contains(&d), "distance was {d}");
    }
}
