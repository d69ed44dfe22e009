//! Content item repository implementation

use crate::error::{Error, Result};
use crate::models::{ContentId, ContentItem, SyncStatus};
use libsql::{params, Connection, Row};

/// Trait for content item storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ContentRepository {
    /// Insert or replace an item by id
    async fn put(&self, item: &ContentItem) -> Result<()>;

    /// Get an item by id
    async fn get(&self, id: &ContentId) -> Result<Option<ContentItem>>;

    /// Physically remove an item by id
    async fn delete(&self, id: &ContentId) -> Result<()>;

    /// List all items, newest created first
    async fn list_all(&self) -> Result<Vec<ContentItem>>;

    /// List items with the given sync status, newest created first
    async fn list_by_status(&self, status: SyncStatus) -> Result<Vec<ContentItem>>;
}

/// libSQL implementation of `ContentRepository`
pub struct LibSqlContentRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlContentRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an item from the JSON body column
    fn parse_item(row: &Row) -> Result<ContentItem> {
        let body: String = row.get(0)?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn query_items(&self, sql: &str, args: impl libsql::params::IntoParams) -> Result<Vec<ContentItem>> {
        let mut rows = self.conn.query(sql, args).await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::parse_item(&row)?);
        }
        Ok(items)
    }
}

impl ContentRepository for LibSqlContentRepository<'_> {
    async fn put(&self, item: &ContentItem) -> Result<()> {
        let body = serde_json::to_string(item)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO content_items
                 (id, owner_id, is_public, created_at, updated_at, sync_status, body)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    item.id.as_str(),
                    item.owner_id.as_str(),
                    i32::from(item.is_public),
                    item.created_at,
                    item.updated_at,
                    item.sync_status.as_str(),
                    body,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &ContentId) -> Result<Option<ContentItem>> {
        let mut rows = self
            .conn
            .query(
                "SELECT body FROM content_items WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_item(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &ContentId) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "DELETE FROM content_items WHERE id = ?",
                params![id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ContentItem>> {
        self.query_items(
            "SELECT body FROM content_items ORDER BY created_at DESC",
            (),
        )
        .await
    }

    async fn list_by_status(&self, status: SyncStatus) -> Result<Vec<ContentItem>> {
        self.query_items(
            "SELECT body FROM content_items WHERE sync_status = ? ORDER BY created_at DESC",
            params![status.as_str()],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{ContentPayload, GeoPosition, NewContent};
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn sample(title: &str) -> ContentItem {
        ContentItem::new_local(
            "user-1",
            NewContent {
                title: title.to_string(),
                description: None,
                payload: ContentPayload::Text {
                    body: "hi".to_string(),
                },
                position: GeoPosition::new(48.2, 16.4),
                is_public: false,
            },
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_and_get() {
        let db = setup().await;
        let repo = LibSqlContentRepository::new(db.connection());

        let item = sample("First");
        repo.put(&item).await.unwrap();

        let fetched = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_replaces_existing_row() {
        let db = setup().await;
        let repo = LibSqlContentRepository::new(db.connection());

        let mut item = sample("First");
        repo.put(&item).await.unwrap();

        item.title = "Renamed".to_string();
        item.sync_status = SyncStatus::Synced;
        repo.put(&item).await.unwrap();

        let fetched = repo.get(&item.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Renamed");
        assert_eq!(fetched.sync_status, SyncStatus::Synced);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_all_newest_first() {
        let db = setup().await;
        let repo = LibSqlContentRepository::new(db.connection());

        let mut a = sample("A");
        a.created_at = 100;
        let mut b = sample("B");
        b.created_at = 200;
        repo.put(&a).await.unwrap();
        repo.put(&b).await.unwrap();

        let items = repo.list_all().await.unwrap();
        assert_eq!(items[0].title, "B");
        assert_eq!(items[1].title, "A");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_status() {
        let db = setup().await;
        let repo = LibSqlContentRepository::new(db.connection());

        let pending = sample("P");
        let mut synced = sample("S");
        synced.sync_status = SyncStatus::Synced;
        repo.put(&pending).await.unwrap();
        repo.put(&synced).await.unwrap();

        let found = repo.list_by_status(SyncStatus::Synced).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "S");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_missing_is_not_found() {
        let db = setup().await;
        let repo = LibSqlContentRepository::new(db.connection());

        let item = sample("Gone");
        repo.put(&item).await.unwrap();
        repo.delete(&item.id).await.unwrap();

        assert!(repo.get(&item.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&item.id).await,
            Err(Error::NotFound(_))
        ));
    }
}
