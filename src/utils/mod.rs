// src/utils/mod.rs
use crate::error::SyncError;
use log::{info, LevelFilter};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

pub mod timing;

/// Installs the process-wide logger. Call once, before any component starts.
pub fn setup_logging(level: LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("h2", LevelFilter::Warn)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("tonic", LevelFilter::Warn)
        .level_for("rustls", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;
    info!("Logging initialized at level {}.", level);
    Ok(())
}

pub fn parse_pubkey(name: &str, value: &str) -> Result<Pubkey, SyncError> {
    Pubkey::from_str(value.trim())
        .map_err(|e| SyncError::Config(format!("{} '{}' is not a valid address: {}", name, value, e)))
}
