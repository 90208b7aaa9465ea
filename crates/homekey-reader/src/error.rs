use homekey_storage::StorageError;
use thiserror::Error;

/// Errors of the reader side of the runtime.
///
/// Bus failures never show up here: the card loop absorbs them and
/// recovers through the reconnect worker.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Invalid key flow: {0} (expected 0, 1 or 2)")]
    InvalidKeyFlow(u8),

    /// Reader identity could not be persisted
    #[error("Reader data error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, ReaderError>;
