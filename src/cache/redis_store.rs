// src/cache/redis_store.rs
//! Redis-backed pool store.

use crate::cache::PoolStore;
use crate::error::SyncError;
use async_trait::async_trait;
use log::{debug, error, info};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::HashMap;
use std::fmt;

/// A shared Redis client.
/// Uses a `ConnectionManager` for automatic reconnection and resilience.
#[derive(Clone)]
pub struct RedisStore {
    conn_manager: ConnectionManager,
    redis_url: String,
}

// Manual Debug: ConnectionManager is not Debug, and the URL may carry a password.
impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("redis_url", &redact_password(&self.redis_url))
            .field("conn_manager", &"<ConnectionManager instance>")
            .finish()
    }
}

impl RedisStore {
    pub async fn new(redis_url: &str) -> Result<Self, SyncError> {
        info!(
            "Initializing Redis connection manager for URL: {}",
            redact_password(redis_url)
        );
        let client = redis::Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to create Redis ConnectionManager: {}", e);
            SyncError::Store(format!("Failed to create Redis ConnectionManager: {}", e))
        })?;
        info!("Redis ConnectionManager initialized successfully.");
        Ok(Self {
            conn_manager,
            redis_url: redis_url.to_string(),
        })
    }
}

/// Builds a `redis://` URL from address, password and database index.
pub fn redis_url(addr: &str, password: &str, db: i64) -> String {
    if password.is_empty() {
        format!("redis://{}/{}", addr, db)
    } else {
        format!("redis://:{}@{}/{}", password, addr, db)
    }
}

pub fn redact_password(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl PoolStore for RedisStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let mut conn = self.conn_manager.clone();
        conn.set::<_, _, ()>(key, value).await?;
        debug!("Redis SET success for key: {}", key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let mut conn = self.conn_manager.clone();
        let value = conn.get::<_, Option<String>>(key).await?;
        debug!(
            "Redis GET for key {}: {}",
            key,
            if value.is_some() { "HIT" } else { "MISS" }
        );
        Ok(value)
    }

    async fn set_if_not_exists(&self, key: &str, value: &str) -> Result<bool, SyncError> {
        let mut conn = self.conn_manager.clone();
        let stored = conn.set_nx::<_, _, bool>(key, value).await?;
        Ok(stored)
    }

    async fn batch_set(&self, entries: &HashMap<String, String>) -> Result<(), SyncError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.set(key, value).ignore();
        }
        let mut conn = self.conn_manager.clone();
        pipe.query_async::<_, ()>(&mut conn).await.map_err(|e| {
            error!("Redis pipeline of {} SETs failed: {}", entries.len(), e);
            SyncError::Store(format!("failed to execute batch set: {}", e))
        })?;
        debug!("Redis pipeline stored {} keys", entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_url_without_password() {
        assert_eq!(redis_url("localhost:6379", "", 0), "redis://localhost:6379/0");
    }

    #[test]
    fn test_redis_url_with_password() {
        assert_eq!(
            redis_url("cache.internal:6380", "s3cret", 2),
            "redis://:s3cret@cache.internal:6380/2"
        );
    }

    #[test]
    fn test_password_is_redacted() {
        assert_eq!(
            redact_password("redis://:s3cret@cache.internal:6380/2"),
            "redis://***@cache.internal:6380/2"
        );
        assert_eq!(redact_password("redis://localhost:6379/0"), "redis://localhost:6379/0");
    }
}
