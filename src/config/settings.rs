// src/config/settings.rs
use crate::cache::redis_store::redis_url;
use crate::cache::LiveWritePolicy;
use crate::dex::{
    RAYDIUM_AMM_CREATE_FEE_ACCOUNT, RAYDIUM_LIQUIDITY_POOL_V4_PROGRAM_ID,
    RAYDIUM_LIQUIDITY_SNAPSHOT_URL, WSOL_MINT,
};
use crate::error::{ReconnectPolicy, SyncError};
use crate::utils::parse_pubkey;
use log::LevelFilter;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GEYSER_ENDPOINT: &str = "https://solana-yellowstone-grpc.publicnode.com:443";

#[derive(Debug, Clone)]
pub struct Config {
    /// Full connection URL; wins over the addr/password/db triple when set.
    pub redis_url: Option<String>,
    pub redis_addr: String,
    pub redis_password: String,
    pub redis_db: i64,
    pub snapshot_url: String,
    pub snapshot_path: PathBuf,
    pub program_id: String,
    pub anchor_mint: String,
    pub sync_interval_mins: u64,
    pub geyser_endpoint: String,
    pub geyser_x_token: Option<String>,
    pub stream_required_account: String,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub reconnect_max_attempts: Option<u32>,
    pub log_level: String,
    pub live_write_policy: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            redis_url: None,
            redis_addr: "localhost:6379".to_string(),
            redis_password: String::new(),
            redis_db: 0,
            snapshot_url: RAYDIUM_LIQUIDITY_SNAPSHOT_URL.to_string(),
            snapshot_path: PathBuf::from("mainnet.json"),
            program_id: RAYDIUM_LIQUIDITY_POOL_V4_PROGRAM_ID.to_string(),
            anchor_mint: WSOL_MINT.to_string(),
            sync_interval_mins: 30,
            geyser_endpoint: DEFAULT_GEYSER_ENDPOINT.to_string(),
            geyser_x_token: None,
            stream_required_account: RAYDIUM_AMM_CREATE_FEE_ACCOUNT.to_string(),
            reconnect_base_delay_ms: 0,
            reconnect_max_delay_ms: 30_000,
            reconnect_max_attempts: None,
            log_level: "info".to_string(),
            live_write_policy: "overwrite".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()),
            redis_addr: env::var("REDIS_ADDR").unwrap_or(defaults.redis_addr),
            redis_password: env::var("REDIS_PASSWORD").unwrap_or(defaults.redis_password),
            redis_db: env::var("REDIS_DB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.redis_db),
            snapshot_url: env::var("SNAPSHOT_URL").unwrap_or(defaults.snapshot_url),
            snapshot_path: env::var("SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            program_id: env::var("AMM_PROGRAM_ID").unwrap_or(defaults.program_id),
            anchor_mint: env::var("ANCHOR_MINT").unwrap_or(defaults.anchor_mint),
            sync_interval_mins: env::var("SYNC_INTERVAL_MINS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sync_interval_mins),
            geyser_endpoint: env::var("GEYSER_ENDPOINT").unwrap_or(defaults.geyser_endpoint),
            geyser_x_token: env::var("GEYSER_X_TOKEN").ok().filter(|s| !s.is_empty()),
            stream_required_account: env::var("STREAM_REQUIRED_ACCOUNT")
                .unwrap_or(defaults.stream_required_account),
            reconnect_base_delay_ms: env::var("RECONNECT_BASE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reconnect_base_delay_ms),
            reconnect_max_delay_ms: env::var("RECONNECT_MAX_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reconnect_max_delay_ms),
            reconnect_max_attempts: env::var("RECONNECT_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok()),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            live_write_policy: env::var("LIVE_WRITE_POLICY").unwrap_or(defaults.live_write_policy),
        }
    }

    pub fn resolved_redis_url(&self) -> String {
        match &self.redis_url {
            Some(url) => url.clone(),
            None => redis_url(&self.redis_addr, &self.redis_password, self.redis_db),
        }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect_base_delay_ms),
            Duration::from_millis(self.reconnect_max_delay_ms),
            self.reconnect_max_attempts,
        )
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_mins * 60)
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, SyncError> {
        LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| SyncError::Config(format!("unknown log level '{}'", self.log_level)))
    }

    pub fn live_policy(&self) -> Result<LiveWritePolicy, SyncError> {
        self.live_write_policy.parse()
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.program_id.trim().is_empty() {
            return Err(SyncError::Config("AMM_PROGRAM_ID cannot be empty".to_string()));
        }
        if self.anchor_mint.trim().is_empty() {
            return Err(SyncError::Config("ANCHOR_MINT cannot be empty".to_string()));
        }
        if self.geyser_endpoint.trim().is_empty() {
            return Err(SyncError::Config("GEYSER_ENDPOINT cannot be empty".to_string()));
        }
        if self.sync_interval_mins == 0 {
            return Err(SyncError::Config(
                "SYNC_INTERVAL_MINS must be greater than zero".to_string(),
            ));
        }
        if self.reconnect_max_delay_ms < self.reconnect_base_delay_ms {
            return Err(SyncError::Config(
                "RECONNECT_MAX_DELAY_MS must not be below RECONNECT_BASE_DELAY_MS".to_string(),
            ));
        }
        parse_pubkey("AMM_PROGRAM_ID", &self.program_id)?;
        parse_pubkey("ANCHOR_MINT", &self.anchor_mint)?;
        parse_pubkey("STREAM_REQUIRED_ACCOUNT", &self.stream_required_account)?;
        self.log_level_filter()?;
        self.live_policy()?;
        Ok(())
    }

    pub fn validate_and_log(&self) {
        log::info!(
            "Configuration loaded: redis={} program={} anchor={} interval={}m geyser={} live_policy={}",
            crate::cache::redis_store::redact_password(&self.resolved_redis_url()),
            self.program_id,
            self.anchor_mint,
            self.sync_interval_mins,
            self.geyser_endpoint,
            self.live_write_policy
        );
        if self.geyser_x_token.is_none() {
            log::debug!("No GEYSER_X_TOKEN set, connecting without auth token");
        }
    }
}
