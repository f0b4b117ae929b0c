// src/error/mod.rs
use log::debug;
use rand::Rng;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Snapshot document does not have the expected object/array shape
    #[error("Snapshot Format Error: {0}")]
    SnapshotFormat(String),

    /// Local file IO (snapshot file, output file)
    #[error("IO Error: {0}")]
    Io(String),

    /// Snapshot download failures (HTTP status, transport)
    #[error("Download Error: {0}")]
    Download(String),

    /// Cache/Redis errors
    #[error("Store Error: {0}")]
    Store(String),

    /// Geyser connection/subscription/receive failures
    #[error("Stream Error: {0}")]
    Stream(String),

    /// A stream update that could not be turned into a transaction view
    #[error("Decode Error: {0}")]
    Decode(String),

    /// Configuration errors
    #[error("Config Error: {0}")]
    Config(String),

    /// Reconnect attempts ceiling reached
    #[error("Retries Exhausted after {0} attempts")]
    RetriesExhausted(u32),
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        // IO failures surface through serde_json when streaming from a reader.
        if err.is_io() {
            SyncError::Io(err.to_string())
        } else {
            SyncError::SnapshotFormat(err.to_string())
        }
    }
}

impl From<redis::RedisError> for SyncError {
    fn from(err: redis::RedisError) -> Self {
        SyncError::Store(format!("Redis error: {}", err))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Download(err.to_string())
    }
}

impl SyncError {
    /// Determines if an error is recoverable by running the operation again
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::SnapshotFormat(_) => true, // next snapshot may be well formed
            SyncError::Io(_) => true,
            SyncError::Download(_) => true,
            SyncError::Store(_) => true,
            SyncError::Stream(_) => true,
            SyncError::Decode(_) => true,
            SyncError::Config(_) => false,
            SyncError::RetriesExhausted(_) => false,
        }
    }

    /// Categorizes error for logging
    pub fn categorize(&self) -> ErrorCategory {
        match self {
            SyncError::SnapshotFormat(_) | SyncError::Decode(_) => ErrorCategory::Data,
            SyncError::Io(_) | SyncError::Store(_) => ErrorCategory::Infrastructure,
            SyncError::Download(_) | SyncError::Stream(_) => ErrorCategory::Network,
            SyncError::Config(_) => ErrorCategory::Configuration,
            SyncError::RetriesExhausted(_) => ErrorCategory::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Infrastructure,
    Critical,
}

/// Reconnect policy with capped exponential backoff and full jitter.
///
/// A zero `base_delay` reconnects immediately every time. `max_attempts: None`
/// never gives up.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(0),
            max_delay: Duration::from_secs(30),
            max_attempts: None,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            jitter: true,
        }
    }

    /// Upper bound of the delay before reconnect attempt `attempt` (1-based).
    pub fn ceiling_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2_u128.saturating_pow(attempt.saturating_sub(1).min(32));
        let delay_ms = self.base_delay.as_millis().saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis()) as u64)
    }

    /// Delay for a given attempt, jittered uniformly in `[0, ceiling]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling_for_attempt(attempt);
        let delay = if self.jitter && !ceiling.is_zero() {
            let ms = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
            Duration::from_millis(ms)
        } else {
            ceiling
        };
        debug!("Reconnect attempt {}: delay = {:?}", attempt, delay);
        delay
    }

    /// True once `attempt` exceeds the configured ceiling.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempt > max)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
