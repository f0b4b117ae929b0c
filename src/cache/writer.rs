// src/cache/writer.rs
//! Turns canonical pools into cache writes.
//!
//! Bulk writes resolve key collisions in memory (last write wins) and go out
//! as a single pipelined batch. Live writes are best effort: failures are
//! logged, never returned.

use crate::cache::PoolStore;
use crate::dex::Pool;
use crate::error::SyncError;
use log::{error, info, warn};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// A key that was written twice in one bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub key: String,
    pub replaced_value: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkWriteReport {
    pub total_records: usize,
    pub distinct_keys: usize,
    /// Pools with no non-anchor mint to key them by.
    pub skipped: usize,
    pub collisions: Vec<KeyCollision>,
}

impl BulkWriteReport {
    pub fn collision_count(&self) -> usize {
        self.collisions.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiveWritePolicy {
    /// Last write wins, like bulk runs.
    #[default]
    Overwrite,
    /// Keep whatever is already cached for the key.
    Preserve,
}

impl FromStr for LiveWritePolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(LiveWritePolicy::Overwrite),
            "preserve" => Ok(LiveWritePolicy::Preserve),
            other => Err(SyncError::Config(format!(
                "unknown live write policy '{}' (expected overwrite|preserve)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveWriteOutcome {
    Written,
    AlreadyCached,
    /// No distinguishing mint to key the entry by.
    Skipped,
    Failed,
}

/// Builds the key → value map for a bulk run, counting overwritten keys.
/// Pools without a key are skipped, as on the live path.
pub fn build_batch(pools: &[Pool]) -> (HashMap<String, String>, BulkWriteReport) {
    let mut batch: HashMap<String, String> = HashMap::with_capacity(pools.len());
    let mut collisions = Vec::new();
    let mut skipped = 0;

    for pool in pools {
        if pool.cache_key().is_empty() {
            warn!("Pool {} has no anchor-paired mint, not caching it", pool.id);
            skipped += 1;
            continue;
        }
        let key = pool.cache_key().to_string();
        let value = pool.cache_value();
        if let Some(replaced_value) = batch.insert(key.clone(), value.clone()) {
            warn!(
                "Overwrite duplicate key {}: {} replaced by {}",
                key, replaced_value, value
            );
            collisions.push(KeyCollision {
                key,
                replaced_value,
                value,
            });
        }
    }

    let report = BulkWriteReport {
        total_records: pools.len(),
        distinct_keys: batch.len(),
        skipped,
        collisions,
    };
    (batch, report)
}

#[derive(Clone)]
pub struct CacheWriter {
    store: Arc<dyn PoolStore>,
}

impl CacheWriter {
    pub fn new(store: Arc<dyn PoolStore>) -> Self {
        Self { store }
    }

    /// Writes every pool in one batch. A failed batch fails the whole call.
    pub async fn write_bulk(&self, pools: &[Pool]) -> Result<BulkWriteReport, SyncError> {
        let (batch, report) = build_batch(pools);

        info!("All pool count: {}", report.total_records);
        info!("Duplicate pool count: {}", report.collision_count());
        info!("Effective pool count: {}", report.distinct_keys);
        if report.skipped > 0 {
            warn!("Skipped pool count: {}", report.skipped);
        }

        self.store.batch_set(&batch).await?;
        info!("Stored {} keys in one batch", batch.len());
        Ok(report)
    }

    /// Writes one live-discovered pool, logging the result.
    pub async fn write_live(&self, pool: &Pool, policy: LiveWritePolicy) -> LiveWriteOutcome {
        let key = pool.cache_key();
        if key.is_empty() {
            warn!(
                "Pool {} has no anchor-paired mint, not caching it",
                pool.id
            );
            return LiveWriteOutcome::Skipped;
        }
        let value = pool.cache_value();

        let result = match policy {
            LiveWritePolicy::Overwrite => self.store.set(key, &value).await.map(|_| true),
            LiveWritePolicy::Preserve => self.store.set_if_not_exists(key, &value).await,
        };

        match result {
            Ok(true) => {
                info!(
                    "Write new Raydium pool. CA: {} Pool ID: {} BaseVault: {} QuoteVault: {}",
                    key, pool.id, pool.base_vault, pool.quote_vault
                );
                LiveWriteOutcome::Written
            }
            Ok(false) => {
                info!("Key {} already cached, keeping existing entry", key);
                LiveWriteOutcome::AlreadyCached
            }
            Err(e) => {
                error!("Failed to write pool {} under {}: {}", pool.id, key, e);
                LiveWriteOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use pretty_assertions::assert_eq;

    fn pool(id: &str, mint: &str) -> Pool {
        Pool {
            id: id.to_string(),
            program_id: "X".to_string(),
            base_mint: mint.to_string(),
            quote_mint: "ANCHOR".to_string(),
            base_vault: format!("{}-base", id),
            quote_vault: format!("{}-quote", id),
        }
    }

    #[test]
    fn test_build_batch_counts_one_collision_per_overwrite() {
        let (batch, report) = build_batch(&[pool("P1", "T1"), pool("P2", "T2"), pool("P3", "T1")]);
        assert_eq!(report.total_records, 3);
        assert_eq!(report.distinct_keys, 2);
        assert_eq!(report.collision_count(), 1);
        assert_eq!(
            report.collisions[0],
            KeyCollision {
                key: "T1".to_string(),
                replaced_value: "P1,P1-base,P1-quote".to_string(),
                value: "P3,P3-base,P3-quote".to_string(),
            }
        );
        assert_eq!(batch["T1"], "P3,P3-base,P3-quote");
    }

    #[test]
    fn test_build_batch_skips_unkeyed_pools() {
        let (batch, report) = build_batch(&[pool("P1", ""), pool("P2", "T2")]);
        assert_eq!(report.total_records, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.distinct_keys, 1);
        assert!(!batch.contains_key(""));
        assert_eq!(batch["T2"], "P2,P2-base,P2-quote");
    }

    #[tokio::test]
    async fn test_write_bulk_stores_last_value_in_one_batch() {
        let store = Arc::new(MemoryStore::new());
        let writer = CacheWriter::new(store.clone());
        let report = writer
            .write_bulk(&[pool("P1", "T1"), pool("P2", "T1")])
            .await
            .unwrap();
        assert_eq!(report.collision_count(), 1);
        assert_eq!(store.batch_count(), 1);
        assert_eq!(store.get("T1").await.unwrap().as_deref(), Some("P2,P2-base,P2-quote"));
    }

    #[tokio::test]
    async fn test_write_bulk_surfaces_batch_failure() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let writer = CacheWriter::new(store.clone());
        let result = writer.write_bulk(&[pool("P1", "T1")]).await;
        assert!(matches!(result, Err(SyncError::Store(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_write_live_policies() {
        let store = Arc::new(MemoryStore::new());
        let writer = CacheWriter::new(store.clone());

        assert_eq!(
            writer.write_live(&pool("P1", "T1"), LiveWritePolicy::Overwrite).await,
            LiveWriteOutcome::Written
        );
        assert_eq!(
            writer.write_live(&pool("P2", "T1"), LiveWritePolicy::Preserve).await,
            LiveWriteOutcome::AlreadyCached
        );
        assert_eq!(store.get("T1").await.unwrap().as_deref(), Some("P1,P1-base,P1-quote"));

        assert_eq!(
            writer.write_live(&pool("P3", "T1"), LiveWritePolicy::Overwrite).await,
            LiveWriteOutcome::Written
        );
        assert_eq!(store.get("T1").await.unwrap().as_deref(), Some("P3,P3-base,P3-quote"));
    }

    #[tokio::test]
    async fn test_write_live_swallows_failures_and_skips_unkeyed_pools() {
        let store = Arc::new(MemoryStore::new());
        let writer = CacheWriter::new(store.clone());
        assert_eq!(
            writer.write_live(&pool("P1", ""), LiveWritePolicy::Overwrite).await,
            LiveWriteOutcome::Skipped
        );
        store.set_fail_writes(true);
        assert_eq!(
            writer.write_live(&pool("P2", "T2"), LiveWritePolicy::Overwrite).await,
            LiveWriteOutcome::Failed
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_live_write_policy_parse() {
        assert_eq!("overwrite".parse::<LiveWritePolicy>().unwrap(), LiveWritePolicy::Overwrite);
        assert_eq!(" Preserve ".parse::<LiveWritePolicy>().unwrap(), LiveWritePolicy::Preserve);
        assert!("sometimes".parse::<LiveWritePolicy>().is_err());
    }
}
