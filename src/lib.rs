// src/lib.rs
pub mod cache;
pub mod config;
pub mod data; // snapshot download
pub mod dex; // pool model + snapshot filter
pub mod error;
pub mod orchestrator;
pub mod streams; // geyser feed + pool-creation extraction
pub mod utils;

pub use cache::{CacheWriter, MemoryStore, PoolStore, RedisStore};
pub use dex::{Pool, PoolKeys, SnapshotFilter};
pub use error::{ReconnectPolicy, SyncError};
pub use orchestrator::{shutdown_channel, BulkSync, Monitor, Shutdown, ShutdownTrigger};
