//! Key/value blob store.
//!
//! Writes and erases are staged and only become durable on
//! [`commit`](BlobStore::commit), which applies everything staged so far in
//! one transaction. Reads see staged values first, so a component reading
//! back its own uncommitted write observes it.

#![allow(async_fn_in_trait)]

use crate::connection::Database;
use crate::error::{StorageError, StorageResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Pending change for one key; `None` means erase.
type Staged = BTreeMap<String, Option<Vec<u8>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Persistent blob store.
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stage `value` under `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Stage removal of `key`.
    async fn erase(&self, key: &str) -> StorageResult<()>;

    /// Make all staged changes durable.
    async fn commit(&self) -> StorageResult<()>;
}

/// SQLite-backed blob store.
#[derive(Debug)]
pub struct SqliteBlobStore {
    db: Database,
    staged: Mutex<Staged>,
}

impl SqliteBlobStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            staged: Mutex::new(Staged::new()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn write_batch(&self, batch: &Staged) -> StorageResult<()> {
        let mut tx = self.db.pool().begin().await?;
        for (key, value) in batch {
            match value {
                Some(bytes) => {
                    sqlx::query(
                        r#"
                        INSERT INTO blobs (key, value) VALUES (?, ?)
                        ON CONFLICT(key) DO UPDATE SET
                            value = excluded.value,
                            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                        "#,
                    )
                    .bind(key)
                    .bind(bytes)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query("DELETE FROM blobs WHERE key = ?")
                        .bind(key)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

impl BlobStore for SqliteBlobStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if let Some(staged) = lock(&self.staged).get(key) {
            return Ok(staged.clone());
        }
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT value FROM blobs WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        lock(&self.staged).insert(key.to_string(), Some(value));
        Ok(())
    }

    async fn erase(&self, key: &str) -> StorageResult<()> {
        lock(&self.staged).insert(key.to_string(), None);
        Ok(())
    }

    async fn commit(&self) -> StorageResult<()> {
        let batch = std::mem::take(&mut *lock(&self.staged));
        if batch.is_empty() {
            return Ok(());
        }
        match self.write_batch(&batch).await {
            Ok(()) => {
                debug!("Committed {} blob change(s)", batch.len());
                Ok(())
            }
            Err(e) => {
                // put the batch back under anything staged meanwhile
                let mut staged = lock(&self.staged);
                for (key, value) in batch {
                    staged.entry(key).or_insert(value);
                }
                Err(e)
            }
        }
    }
}

/// In-memory blob store with failure injection, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    committed: Mutex<HashMap<String, Vec<u8>>>,
    staged: Mutex<Staged>,
    fail_commits: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following commit fail (and keep its changes staged).
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Durable value of `key`, ignoring staged changes.
    pub fn committed(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.committed).get(key).cloned()
    }
}

impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if let Some(staged) = lock(&self.staged).get(key) {
            return Ok(staged.clone());
        }
        Ok(lock(&self.committed).get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        lock(&self.staged).insert(key.to_string(), Some(value));
        Ok(())
    }

    async fn erase(&self, key: &str) -> StorageResult<()> {
        lock(&self.staged).insert(key.to_string(), None);
        Ok(())
    }

    async fn commit(&self) -> StorageResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StorageError::CommitFailed(
                "injected commit failure".to_string(),
            ));
        }
        let batch = std::mem::take(&mut *lock(&self.staged));
        let mut committed = lock(&self.committed);
        for (key, value) in batch {
            match value {
                Some(bytes) => {
                    committed.insert(key, bytes);
                }
                None => {
                    committed.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// Enum wrapper for blob store dispatch.
///
/// `BlobStore` uses native async methods and is not object-safe; the
/// runtime shares an `Arc<AnyBlobStore>` instead.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyBlobStore {
    Sqlite(SqliteBlobStore),
    Memory(MemoryBlobStore),
}

impl BlobStore for AnyBlobStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        match self {
            Self::Sqlite(store) => store.get(key).await,
            Self::Memory(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        match self {
            Self::Sqlite(store) => store.set(key, value).await,
            Self::Memory(store) => store.set(key, value).await,
        }
    }

    async fn erase(&self, key: &str) -> StorageResult<()> {
        match self {
            Self::Sqlite(store) => store.erase(key).await,
            Self::Memory(store) => store.erase(key).await,
        }
    }

    async fn commit(&self) -> StorageResult<()> {
        match self {
            Self::Sqlite(store) => store.commit().await,
            Self::Memory(store) => store.commit().await,
        }
    }
}

impl AnyBlobStore {
    /// The in-memory store, if that is the active backend.
    pub fn as_memory(&self) -> Option<&MemoryBlobStore> {
        match self {
            Self::Memory(store) => Some(store),
            Self::Sqlite(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_staged_until_commit() {
        let store = MemoryBlobStore::new();
        store.set("MISCDATA", b"{}".to_vec()).await.unwrap();

        assert_eq!(store.get("MISCDATA").await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(store.committed("MISCDATA"), None);

        store.commit().await.unwrap();
        assert_eq!(store.committed("MISCDATA"), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_erase() {
        let store = MemoryBlobStore::new();
        store.set("READERDATA", vec![1, 2, 3]).await.unwrap();
        store.commit().await.unwrap();

        store.erase("READERDATA").await.unwrap();
        assert_eq!(store.get("READERDATA").await.unwrap(), None);
        store.commit().await.unwrap();
        assert_eq!(store.committed("READERDATA"), None);
    }

    #[tokio::test]
    async fn test_memory_commit_failure_keeps_staged() {
        let store = MemoryBlobStore::new();
        store.set_fail_commits(true);
        store.set("MISCDATA", vec![9]).await.unwrap();

        assert!(matches!(
            store.commit().await,
            Err(StorageError::CommitFailed(_))
        ));
        assert_eq!(store.committed("MISCDATA"), None);

        store.set_fail_commits(false);
        store.commit().await.unwrap();
        assert_eq!(store.committed("MISCDATA"), Some(vec![9]));
    }

    #[tokio::test]
    async fn test_sqlite_roundtrip() {
        let store = SqliteBlobStore::new(Database::in_memory().await.unwrap());
        assert_eq!(store.get("MISCDATA").await.unwrap(), None);

        store.set("MISCDATA", vec![1, 2]).await.unwrap();
        store.commit().await.unwrap();
        store.set("MISCDATA", vec![3]).await.unwrap();
        store.commit().await.unwrap();
        assert_eq!(store.get("MISCDATA").await.unwrap(), Some(vec![3]));

        store.erase("MISCDATA").await.unwrap();
        store.commit().await.unwrap();
        assert_eq!(store.get("MISCDATA").await.unwrap(), None);
    }
}
