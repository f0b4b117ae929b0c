// src/dex/mod.rs
pub mod raydium_models;
pub mod snapshot;

pub use raydium_models::{Pool, PoolKeys, SnapshotEntry};
pub use snapshot::SnapshotFilter;

/// Raydium Liquidity Pool V4 (AMM) program.
pub const RAYDIUM_LIQUIDITY_POOL_V4_PROGRAM_ID: &str =
    "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

/// Raydium AMM pool-creation fee destination. Every pool-creation transaction
/// references it, so it is the natural subscription filter.
pub const RAYDIUM_AMM_CREATE_FEE_ACCOUNT: &str = "7YttLkHDoNj9wyDur5pM1ejNaAvT9X4eqaYcHQqtj2G5";

/// Wrapped SOL mint, the default anchor asset.
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

pub const RAYDIUM_LIQUIDITY_SNAPSHOT_URL: &str =
    "https://api.raydium.io/v2/sdk/liquidity/mainnet.json";
