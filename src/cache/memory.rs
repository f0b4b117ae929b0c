// src/cache/memory.rs
//! In-process pool store, used for dry runs and tests.

use crate::cache::PoolStore;
use crate::error::SyncError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    fail_writes: AtomicBool,
    batches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with a store error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful `batch_set` calls.
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn check_writable(&self) -> Result<(), SyncError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(SyncError::Store("memory store rejecting writes".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PoolStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        self.check_writable()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set_if_not_exists(&self, key: &str, value: &str) -> Result<bool, SyncError> {
        self.check_writable()?;
        let mut stored = false;
        self.entries.entry(key.to_string()).or_insert_with(|| {
            stored = true;
            value.to_string()
        });
        Ok(stored)
    }

    async fn batch_set(&self, entries: &HashMap<String, String>) -> Result<(), SyncError> {
        self.check_writable()?;
        for (key, value) in entries {
            self.entries.insert(key.clone(), value.clone());
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
