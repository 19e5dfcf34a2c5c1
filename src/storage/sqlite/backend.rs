use crate::errors::{AppError, AppResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::BlobBackend;

/// Persistent backend: one row per collection key.
pub struct SqliteBackend {
    storage: SqliteStorage,
}

impl SqliteBackend {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

impl BlobBackend for SqliteBackend {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare("SELECT value FROM blobs WHERE key = ?1")?;

        let value = stmt.query_row([key], |row| row.get::<_, String>(0));

        match value {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::from(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.storage.connection()?;
        conn.execute(
            "INSERT INTO blobs (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            (key, value),
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let conn = self.storage.connection()?;
        conn.execute("DELETE FROM blobs WHERE key = ?1", [key])?;
        Ok(())
    }
}
