//! Persistence for the HomeKey lock runtime.
//!
//! The firmware keeps two records in a key/value store: the device
//! configuration (`MISCDATA`) and the reader identity (`READERDATA`). This
//! crate provides:
//!
//! - [`BlobStore`]: the key/value interface with staged writes and an
//!   explicit [`commit`](BlobStore::commit), backed by SQLite
//!   ([`SqliteBlobStore`]) or memory ([`MemoryBlobStore`]).
//! - [`Database`] / [`StoreConfig`]: the `sqlx` pool with embedded
//!   migrations.
//! - [`ConfigRepository`] and [`ReaderDataRepository`]: JSON-encoded typed
//!   access to the two records.
//! - [`ReaderData`]: the reader identity model and its maintenance
//!   operations.
//!
//! # Examples
//!
//! ```no_run
//! use homekey_storage::{AnyBlobStore, ConfigRepository, Database, SqliteBlobStore, StoreConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(StoreConfig::new("homekey.db")).await?;
//! let store = Arc::new(AnyBlobStore::Sqlite(SqliteBlobStore::new(db)));
//!
//! let configs = ConfigRepository::config(Arc::clone(&store));
//! let mut config = configs.load().await;
//! config.nfc_success_pin = 4;
//! configs.save(&config).await?;
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use blob::{AnyBlobStore, BlobStore, MemoryBlobStore, SqliteBlobStore};
pub use connection::{Database, StoreConfig};
pub use error::{StorageError, StorageResult};
pub use models::{
    Endpoint, Issuer, ReaderData, ReaderInfo, SharedReaderData, issuer_id_for, upper_hex,
};
pub use repositories::{ConfigRepository, ReaderDataRepository, RecordRepository};
