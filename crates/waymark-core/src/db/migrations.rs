//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: content rows plus the singleton key/value state
async fn migrate_v1(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // inside one transaction

    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Content items: hot columns for ordering/filtering, full item as JSON
        "CREATE TABLE IF NOT EXISTS content_items (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            is_public INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            sync_status TEXT NOT NULL,
            body TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_content_created ON content_items(created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_content_status ON content_items(sync_status)",
        "CREATE INDEX IF NOT EXISTS idx_content_owner ON content_items(owner_id)",
        // Singleton records (sync metadata, public cache) under fixed keys
        "CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migration_v1_creates_tables() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        for table in ["content_items", "sync_state"] {
            let mut rows = conn
                .query(
                    "SELECT EXISTS(
                        SELECT 1 FROM sqlite_master
                        WHERE type = 'table' AND name = ?
                    )",
                    [table],
                )
                .await
                .unwrap();

            let exists = rows
                .next()
                .await
                .unwrap()
                .is_some_and(|row| row.get::<i32>(0).unwrap() != 0);

            assert!(exists, "missing table {table}");
        }
    }
}
