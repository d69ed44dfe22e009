//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    async fn configure(&self) -> Result<()> {
        // WAL mode can fail on exotic filesystems; the database still works
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        let mut rows = db.connection().query("SELECT 1", ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_on_disk_persists() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("waymark.db");

        {
            let db = Database::open(&path).await.unwrap();
            db.connection()
                .execute(
                    "INSERT INTO sync_state (key, value) VALUES ('probe', '1')",
                    (),
                )
                .await
                .unwrap();
        }

        let db = Database::open(&path).await.unwrap();
        let mut rows = db
            .connection()
            .query("SELECT value FROM sync_state WHERE key = 'probe'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "1");
    }
}
