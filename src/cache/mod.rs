// src/cache/mod.rs
//! Pool key cache: the store contract and the writer that fills it.

pub mod memory;
pub mod redis_store;
pub mod writer;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use writer::{BulkWriteReport, CacheWriter, KeyCollision, LiveWriteOutcome, LiveWritePolicy};

use crate::error::SyncError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Key-value contract the sync pipelines write through.
#[async_trait]
pub trait PoolStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;

    async fn get(&self, key: &str) -> Result<Option<String>, SyncError>;

    /// Returns `true` when the value was stored.
    async fn set_if_not_exists(&self, key: &str, value: &str) -> Result<bool, SyncError>;

    /// Writes all entries in one round trip, atomically where the backend allows.
    async fn batch_set(&self, entries: &HashMap<String, String>) -> Result<(), SyncError>;
}
