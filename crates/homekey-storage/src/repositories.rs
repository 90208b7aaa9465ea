//! Typed access to the two persisted records.
//!
//! Both records are stored as JSON blobs. Loading never fails on a missing
//! or undecodable blob: the record falls back to its defaults and the
//! problem is logged, so a corrupted store cannot keep the lock from booting.

use crate::blob::{AnyBlobStore, BlobStore};
use crate::error::StorageResult;
use crate::models::ReaderData;
use homekey_core::Configuration;
use homekey_core::constants::{CONFIG_DATA_KEY, READER_DATA_KEY};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Repository for one JSON record stored under a fixed key.
#[derive(Debug)]
pub struct RecordRepository<T, S = AnyBlobStore> {
    store: Arc<S>,
    key: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T, S> Clone for RecordRepository<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _record: PhantomData,
        }
    }
}

/// Device configuration under `MISCDATA`.
pub type ConfigRepository<S = AnyBlobStore> = RecordRepository<Configuration, S>;

/// Reader identity under `READERDATA`.
pub type ReaderDataRepository<S = AnyBlobStore> = RecordRepository<ReaderData, S>;

impl<S: BlobStore> RecordRepository<Configuration, S> {
    pub fn config(store: Arc<S>) -> Self {
        Self::new(store, CONFIG_DATA_KEY)
    }
}

impl<S: BlobStore> RecordRepository<ReaderData, S> {
    pub fn reader_data(store: Arc<S>) -> Self {
        Self::new(store, READER_DATA_KEY)
    }
}

impl<T, S> RecordRepository<T, S>
where
    T: Serialize + DeserializeOwned + Default,
    S: BlobStore,
{
    pub fn new(store: Arc<S>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _record: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Load the record, falling back to defaults.
    pub async fn load(&self) -> T {
        match self.try_load().await {
            Ok(Some(record)) => {
                debug!("Loaded {} from store", self.key);
                record
            }
            Ok(None) => {
                info!("No {} in store, using defaults", self.key);
                T::default()
            }
            Err(e) => {
                warn!("Failed to load {}: {}, using defaults", self.key, e);
                T::default()
            }
        }
    }

    /// Load the record, surfacing read and decode errors.
    pub async fn try_load(&self) -> StorageResult<Option<T>> {
        match self.store.get(self.key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode, stage and commit the record.
    pub async fn save(&self, record: &T) -> StorageResult<()> {
        let bytes = serde_json::to_vec(record)?;
        self.store.set(self.key, bytes).await?;
        self.store.commit().await?;
        debug!("Saved {}", self.key);
        Ok(())
    }

    /// Erase the record and commit.
    pub async fn clear(&self) -> StorageResult<()> {
        self.store.erase(self.key).await?;
        self.store.commit().await?;
        info!("Erased {}", self.key);
        Ok(())
    }
}
