// src/main.rs
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use raydium_pool_sync::{
    cache::{CacheWriter, MemoryStore, PoolStore, RedisStore},
    config::{load_config, Config, ConfigOverrides},
    dex::PoolKeys,
    orchestrator::{run_both, shutdown_channel, BulkSync, Monitor, ShutdownTrigger},
    streams::{GeyserFeed, InstructionLayout, LayoutRegistry, PoolCreationExtractor},
    utils::{parse_pubkey, setup_logging},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Keeps a Redis cache of Raydium AMM pool keys", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Full Redis URL, overrides addr/password/db
    #[arg(long, global = true)]
    redis_url: Option<String>,
    #[arg(long, global = true)]
    redis_addr: Option<String>,
    #[arg(long, global = true)]
    redis_password: Option<String>,
    #[arg(long, global = true)]
    redis_db: Option<i64>,
    #[arg(long, global = true)]
    json_url: Option<String>,
    /// Where the downloaded snapshot is written
    #[arg(long, global = true)]
    output_file: Option<PathBuf>,
    #[arg(long, global = true)]
    program_id: Option<String>,
    /// Mint every cached pool is paired against
    #[arg(long, global = true)]
    quote_mint: Option<String>,
    #[arg(long, global = true)]
    geyser_endpoint: Option<String>,
    #[arg(long, global = true)]
    x_token: Option<String>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// overwrite | preserve
    #[arg(long, global = true)]
    live_write_policy: Option<String>,
}

impl From<GlobalArgs> for ConfigOverrides {
    fn from(args: GlobalArgs) -> Self {
        ConfigOverrides {
            redis_url: args.redis_url,
            redis_addr: args.redis_addr,
            redis_password: args.redis_password,
            redis_db: args.redis_db,
            snapshot_url: args.json_url,
            snapshot_path: args.output_file,
            program_id: args.program_id,
            anchor_mint: args.quote_mint,
            geyser_endpoint: args.geyser_endpoint,
            geyser_x_token: args.x_token,
            log_level: args.log_level,
            live_write_policy: args.live_write_policy,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one bulk sync and exit
    Instant {
        /// Use a snapshot already on disk instead of downloading
        #[arg(long)]
        snapshot_file: Option<PathBuf>,
        /// Write into memory only and print the report
        #[arg(long)]
        dry_run: bool,
    },
    /// Run a bulk sync now and then every MINUTES
    Scheduled { minutes: Option<u64> },
    /// Stream new pool creations into the cache
    Monitor,
    /// Scheduled bulk sync and monitor side by side
    Run { minutes: Option<u64> },
    /// Print the cached pool keys for a mint
    Lookup { mint: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.global.into()).context("invalid configuration")?;

    let level = config.log_level_filter()?;
    setup_logging(level).context("failed to initialize logging")?;
    info!("Raydium pool sync starting");
    config.validate_and_log();

    let (trigger, shutdown) = shutdown_channel();
    spawn_ctrl_c_handler(trigger);

    match cli.command {
        Commands::Instant {
            snapshot_file,
            dry_run,
        } => {
            if dry_run {
                let store = Arc::new(MemoryStore::new());
                let bulk = BulkSync::from_config(&config, snapshot_file, CacheWriter::new(store.clone()));
                let report = bulk.run_once().await?;
                println!(
                    "dry run: {} records, {} distinct keys, {} collisions, {} skipped",
                    report.total_records,
                    report.distinct_keys,
                    report.collision_count(),
                    report.skipped
                );
                for collision in &report.collisions {
                    println!(
                        "  {}: {} replaced by {}",
                        collision.key, collision.replaced_value, collision.value
                    );
                }
            } else {
                let writer = CacheWriter::new(redis_store(&config).await?);
                BulkSync::from_config(&config, snapshot_file, writer)
                    .run_once()
                    .await?;
            }
        }
        Commands::Scheduled { minutes } => {
            let writer = CacheWriter::new(redis_store(&config).await?);
            let bulk = BulkSync::from_config(&config, None, writer);
            bulk.run_scheduled(interval(&config, minutes)?, shutdown).await?;
        }
        Commands::Monitor => {
            let writer = CacheWriter::new(redis_store(&config).await?);
            let stats = build_monitor(&config, writer)?.run(shutdown).await?;
            info!("Monitor exited after {} reconnects", stats.reconnects);
        }
        Commands::Run { minutes } => {
            let writer = CacheWriter::new(redis_store(&config).await?);
            let bulk = BulkSync::from_config(&config, None, writer.clone());
            let monitor = build_monitor(&config, writer)?;
            let every = interval(&config, minutes)?;

            run_both(&bulk, every, &monitor, shutdown).await?;
        }
        Commands::Lookup { mint } => {
            let store = redis_store(&config).await?;
            match store.get(&mint).await? {
                Some(value) => {
                    let keys: PoolKeys = value
                        .parse()
                        .with_context(|| format!("cached value for {} is malformed: {}", mint, value))?;
                    println!("pool id:     {}", keys.pool_id);
                    println!("base vault:  {}", keys.base_vault);
                    println!("quote vault: {}", keys.quote_vault);
                }
                None => warn!("No cached pool for {}", mint),
            }
        }
    }

    info!("Raydium pool sync finished");
    Ok(())
}

async fn redis_store(config: &Config) -> Result<Arc<RedisStore>> {
    let store = RedisStore::new(&config.resolved_redis_url())
        .await
        .context("failed to connect to Redis")?;
    Ok(Arc::new(store))
}

fn interval(config: &Config, minutes: Option<u64>) -> Result<Duration> {
    match minutes {
        Some(0) => anyhow::bail!("interval must be at least one minute"),
        Some(m) => Ok(Duration::from_secs(m * 60)),
        None => Ok(config.sync_interval()),
    }
}

fn build_monitor(config: &Config, writer: CacheWriter) -> Result<Monitor> {
    let program_id = parse_pubkey("AMM_PROGRAM_ID", &config.program_id)?;
    let anchor_mint = parse_pubkey("ANCHOR_MINT", &config.anchor_mint)?;

    let feed = GeyserFeed::new(
        config.geyser_endpoint.clone(),
        config.geyser_x_token.clone(),
        vec![config.stream_required_account.clone()],
    );
    let extractor = PoolCreationExtractor::new(
        LayoutRegistry::new(vec![InstructionLayout::raydium_amm_initialize2(program_id)]),
        anchor_mint,
    );
    Ok(Monitor::new(
        Arc::new(feed),
        extractor,
        writer,
        config.reconnect_policy(),
        config.live_policy()?,
    ))
}

fn spawn_ctrl_c_handler(trigger: ShutdownTrigger) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                trigger.trigger();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}
