//! Persistence of paste records.
//!
//! Every backend must provide the conditional increment as one indivisible
//! operation on a single record; the consumption protocol relies on it and
//! holds no locks of its own.

use async_trait::async_trait;
use thiserror::Error;

use crate::paste::Paste;

pub mod memory;
pub mod rocks;

pub use memory::MemoryStore;
pub use rocks::RocksStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("id already in use")]
    Conflict,
    #[error("view count of {0} cannot be incremented")]
    ViewCountOverflow(String),
    #[error("store is unreachable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] rocksdb::Error),
    #[error("failed to (de)serialize paste: {0}")]
    Codec(#[from] bincode::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn find_by_id(&self, id: &str) -> Result<Option<Paste>, StoreError>;

    /// Increments `view_count` by one if the paste exists and
    /// [`Paste::has_views_left`] holds at the moment of the update. Returns
    /// the updated record, or `None` if the paste is absent or exhausted.
    async fn consume_view(&self, id: &str) -> Result<Option<Paste>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the id is taken.
    async fn insert(&self, paste: Paste) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Flushes and releases the backend. Called once on shutdown.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
