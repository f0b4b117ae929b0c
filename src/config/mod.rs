// src/config/mod.rs
pub mod settings;

pub use settings::Config;

use crate::error::SyncError;
use std::path::PathBuf;
use std::sync::Arc;

/// Values given on the command line. `None` keeps the environment value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub redis_url: Option<String>,
    pub redis_addr: Option<String>,
    pub redis_password: Option<String>,
    pub redis_db: Option<i64>,
    pub snapshot_url: Option<String>,
    pub snapshot_path: Option<PathBuf>,
    pub program_id: Option<String>,
    pub anchor_mint: Option<String>,
    pub geyser_endpoint: Option<String>,
    pub geyser_x_token: Option<String>,
    pub log_level: Option<String>,
    pub live_write_policy: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut Config) {
        if let Some(v) = self.redis_url {
            config.redis_url = Some(v);
        }
        if let Some(v) = self.redis_addr {
            config.redis_addr = v;
        }
        if let Some(v) = self.redis_password {
            config.redis_password = v;
        }
        if let Some(v) = self.redis_db {
            config.redis_db = v;
        }
        if let Some(v) = self.snapshot_url {
            config.snapshot_url = v;
        }
        if let Some(v) = self.snapshot_path {
            config.snapshot_path = v;
        }
        if let Some(v) = self.program_id {
            config.program_id = v;
        }
        if let Some(v) = self.anchor_mint {
            config.anchor_mint = v;
        }
        if let Some(v) = self.geyser_endpoint {
            config.geyser_endpoint = v;
        }
        if let Some(v) = self.geyser_x_token {
            config.geyser_x_token = Some(v);
        }
        if let Some(v) = self.log_level {
            config.log_level = v;
        }
        if let Some(v) = self.live_write_policy {
            config.live_write_policy = v;
        }
    }
}

/// Loads `.env`, the environment and CLI overrides, then validates the result.
pub fn load_config(overrides: ConfigOverrides) -> Result<Arc<Config>, SyncError> {
    dotenv::dotenv().ok();

    let mut config = Config::from_env();
    overrides.apply(&mut config);
    config.validate()?;

    Ok(Arc::new(config))
}
