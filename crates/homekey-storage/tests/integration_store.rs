//! Integration tests for the SQLite blob store and the record repositories.
//!
//! Run with: cargo test --package homekey-storage --test integration_store

use homekey_core::Configuration;
use homekey_core::constants::{CONFIG_DATA_KEY, READER_DATA_KEY};
use homekey_storage::{
    AnyBlobStore, BlobStore, ConfigRepository, Database, ReaderData, ReaderDataRepository,
    SqliteBlobStore, StoreConfig,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn open(dir: &TempDir) -> Arc<AnyBlobStore> {
    let path = dir.path().join("nested").join("homekey.db");
    let db = Database::new(StoreConfig::new(path.to_string_lossy()))
        .await
        .unwrap();
    Arc::new(AnyBlobStore::Sqlite(SqliteBlobStore::new(db)))
}

#[tokio::test]
async fn test_config_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = Configuration {
        gpio_action_pin: 26,
        gpio_action_momentary_enabled: 3,
        ..Default::default()
    };

    {
        let store = open(&dir).await;
        ConfigRepository::config(store).save(&config).await.unwrap();
    }

    let store = open(&dir).await;
    assert_eq!(ConfigRepository::config(store).load().await, config);
}

#[tokio::test]
async fn test_uncommitted_writes_are_lost_on_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir).await;
        store.set(CONFIG_DATA_KEY, b"{}".to_vec()).await.unwrap();
        assert!(store.get(CONFIG_DATA_KEY).await.unwrap().is_some());
    }

    let store = open(&dir).await;
    assert!(store.get(CONFIG_DATA_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_commit_applies_mixed_batch() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    store.set(READER_DATA_KEY, vec![1]).await.unwrap();
    store.commit().await.unwrap();

    store.erase(READER_DATA_KEY).await.unwrap();
    store.set(CONFIG_DATA_KEY, vec![2]).await.unwrap();
    store.commit().await.unwrap();

    assert_eq!(store.get(READER_DATA_KEY).await.unwrap(), None);
    assert_eq!(store.get(CONFIG_DATA_KEY).await.unwrap(), Some(vec![2]));
}

#[tokio::test]
async fn test_reader_data_roundtrip_and_wipe() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    let repo = ReaderDataRepository::reader_data(Arc::clone(&store));

    let mut data = ReaderData {
        reader_gid: vec![0x10; 8],
        reader_id: vec![0x20; 8],
        ..Default::default()
    };
    data.sync_issuers([[9u8; 32].as_slice()]);
    repo.save(&data).await.unwrap();
    assert_eq!(repo.load().await, data);

    repo.clear().await.unwrap();
    assert_eq!(repo.load().await, ReaderData::default());
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    let result: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='blobs'")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(result.0, 1);

    db.health_check().await.unwrap();
    db.close().await;
}
