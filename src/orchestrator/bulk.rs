// src/orchestrator/bulk.rs
//! Bulk snapshot runs: download, filter, write. Once or on a schedule.

use crate::cache::{BulkWriteReport, CacheWriter};
use crate::config::Config;
use crate::data::download_file;
use crate::dex::SnapshotFilter;
use crate::error::SyncError;
use crate::orchestrator::{BulkState, Shutdown};
use crate::utils::timing::Timer;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Fetch `url` into `path` before every run.
    Http { url: String, path: PathBuf },
    /// Use a file already on disk.
    File(PathBuf),
}

pub struct BulkSync {
    source: SnapshotSource,
    filter: SnapshotFilter,
    writer: CacheWriter,
    state: watch::Sender<BulkState>,
}

impl BulkSync {
    pub fn new(source: SnapshotSource, filter: SnapshotFilter, writer: CacheWriter) -> Self {
        let (state, _) = watch::channel(BulkState::Idle);
        Self {
            source,
            filter,
            writer,
            state,
        }
    }

    /// Downloads from the configured snapshot URL unless `snapshot_file` is given.
    pub fn from_config(config: &Config, snapshot_file: Option<PathBuf>, writer: CacheWriter) -> Self {
        let source = match snapshot_file {
            Some(path) => SnapshotSource::File(path),
            None => SnapshotSource::Http {
                url: config.snapshot_url.clone(),
                path: config.snapshot_path.clone(),
            },
        };
        let filter = SnapshotFilter::new(config.program_id.clone(), config.anchor_mint.clone());
        Self::new(source, filter, writer)
    }

    pub fn state(&self) -> BulkState {
        *self.state.borrow()
    }

    /// Observes state transitions, e.g. for progress reporting.
    pub fn subscribe_state(&self) -> watch::Receiver<BulkState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: BulkState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!("Bulk sync: {} -> {}", previous, next);
        }
    }

    /// One full run. Any failure aborts the run; the state always returns to idle.
    pub async fn run_once(&self) -> Result<BulkWriteReport, SyncError> {
        let mut timer = Timer::start("Bulk sync");
        let result = self.run_phases(&mut timer).await;
        self.set_state(BulkState::Idle);

        match &result {
            Ok(report) => {
                info!(
                    "Bulk sync wrote {} keys ({} records, {} collisions)",
                    report.distinct_keys,
                    report.total_records,
                    report.collision_count()
                );
                timer.finish();
            }
            Err(e) => error!("Bulk sync failed: {}", e),
        }
        result
    }

    async fn run_phases(&self, timer: &mut Timer) -> Result<BulkWriteReport, SyncError> {
        let path = match &self.source {
            SnapshotSource::Http { url, path } => {
                self.set_state(BulkState::Downloading);
                info!("Downloading snapshot from {}", url);
                download_file(url, path).await?;
                timer.checkpoint("download");
                path.clone()
            }
            SnapshotSource::File(path) => path.clone(),
        };

        self.set_state(BulkState::Filtering);
        let filter = self.filter.clone();
        let pools = tokio::task::spawn_blocking(move || filter.filter_file(&path))
            .await
            .map_err(|e| SyncError::Io(format!("snapshot filter task failed: {}", e)))??;
        timer.checkpoint("filter");

        self.set_state(BulkState::Writing);
        let report = self.writer.write_bulk(&pools).await?;
        timer.checkpoint("write");
        Ok(report)
    }

    /// Runs immediately, then every `interval` until shutdown. A recoverable
    /// failure is logged and the schedule continues; an unrecoverable one
    /// (bad configuration) stops it. Returns the number of runs started.
    pub async fn run_scheduled(&self, interval: Duration, mut shutdown: Shutdown) -> Result<usize, SyncError> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut runs = 0;

        info!("Scheduled bulk sync every {:?}", interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    runs += 1;
                    if let Err(e) = self.run_once().await {
                        if !e.is_recoverable() {
                            error!("Scheduled run {} failed ({:?}), stopping schedule", runs, e.categorize());
                            return Err(e);
                        }
                        warn!(
                            "Scheduled run {} failed ({:?}), waiting for next tick: {}",
                            runs,
                            e.categorize(),
                            e
                        );
                    }
                }
                _ = shutdown.triggered() => {
                    info!("Scheduled bulk sync stopping after {} runs", runs);
                    break;
                }
            }
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, PoolStore};
    use crate::orchestrator::shutdown_channel;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;

    const SNAPSHOT: &str = r#"{"official":[{"id":"P1","programId":"X","baseMint":"ANCHOR","quoteMint":"T1","baseVault":"BV1","quoteVault":"QV1"}],"unofficial":[]}"#;

    fn snapshot_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn bulk(path: PathBuf, store: Arc<MemoryStore>) -> BulkSync {
        BulkSync::new(
            SnapshotSource::File(path),
            SnapshotFilter::new("X", "ANCHOR"),
            CacheWriter::new(store),
        )
    }

    #[tokio::test]
    async fn test_run_once_from_file() {
        let file = snapshot_file(SNAPSHOT);
        let store = Arc::new(MemoryStore::new());
        let sync = bulk(file.path().to_path_buf(), store.clone());

        let report = sync.run_once().await.unwrap();
        assert_eq!(report.distinct_keys, 1);
        assert_eq!(sync.state(), BulkState::Idle);
        assert_eq!(store.get("T1").await.unwrap().as_deref(), Some("P1,QV1,BV1"));
    }

    #[tokio::test]
    async fn test_malformed_snapshot_fails_run_without_writes() {
        let file = snapshot_file(r#"{"official": {"id": "P1"}}"#);
        let store = Arc::new(MemoryStore::new());
        let sync = bulk(file.path().to_path_buf(), store.clone());

        let result = sync.run_once().await;
        assert!(matches!(result, Err(SyncError::SnapshotFormat(_))));
        assert_eq!(sync.state(), BulkState::Idle);
        assert_eq!(store.batch_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_fails_run() {
        let file = snapshot_file(SNAPSHOT);
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let sync = bulk(file.path().to_path_buf(), store.clone());
        assert!(matches!(sync.run_once().await, Err(SyncError::Store(_))));
    }

    #[tokio::test]
    async fn test_state_passes_through_filtering_and_writing() {
        let file = snapshot_file(SNAPSHOT);
        let store = Arc::new(MemoryStore::new());
        let sync = bulk(file.path().to_path_buf(), store);
        let mut states = sync.subscribe_state();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while states.changed().await.is_ok() {
                let state = *states.borrow_and_update();
                seen.push(state);
                if state == BulkState::Idle {
                    break;
                }
            }
            seen
        });

        sync.run_once().await.unwrap();
        let seen = watcher.await.unwrap();
        assert_eq!(seen.last(), Some(&BulkState::Idle));
        assert!(!seen.contains(&BulkState::Downloading));
    }

    #[tokio::test]
    async fn test_scheduled_runs_immediately_and_survives_failures() {
        let file = snapshot_file("not json");
        let store = Arc::new(MemoryStore::new());
        let sync = Arc::new(bulk(file.path().to_path_buf(), store));
        let (trigger, shutdown) = shutdown_channel();

        let task = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.run_scheduled(Duration::from_millis(10), shutdown).await })
        };
        tokio::time::sleep(Duration::from_millis(45)).await;
        trigger.trigger();

        let runs = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(runs >= 2, "expected repeated runs, got {}", runs);
    }

    #[tokio::test]
    async fn test_scheduled_stops_on_bad_snapshot_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let sync = BulkSync::new(
            SnapshotSource::Http {
                url: "not a url".to_string(),
                path: dir.path().join("mainnet.json"),
            },
            SnapshotFilter::new("X", "ANCHOR"),
            CacheWriter::new(store),
        );
        let (_trigger, shutdown) = shutdown_channel();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            sync.run_scheduled(Duration::from_millis(10), shutdown),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
