// src/orchestrator/mod.rs
//! Drives the two sync pipelines: bulk snapshot runs and the live monitor.

pub mod bulk;
pub mod monitor;

pub use bulk::{BulkSync, SnapshotSource};
pub use monitor::{Monitor, MonitorStats};

use crate::error::SyncError;
use log::{error, info};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkState {
    Idle,
    Downloading,
    Filtering,
    Writing,
}

impl fmt::Display for BulkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BulkState::Idle => "idle",
            BulkState::Downloading => "downloading",
            BulkState::Filtering => "filtering",
            BulkState::Writing => "writing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Streaming,
}

/// Sending half of the cancellation signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // send_replace never fails, even with no receivers left
        self.tx.send_replace(true);
    }
}

/// Cancellation signal shared by every loop. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is triggered. Never resolves if the trigger is
    /// dropped without firing.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Runs the scheduled bulk sync and the monitor side by side against one store.
///
/// The first pipeline to stop ends both: normally that is shutdown, otherwise
/// a fatal error from either side, which is returned.
pub async fn run_both(
    bulk: &BulkSync,
    every: Duration,
    monitor: &Monitor,
    shutdown: Shutdown,
) -> Result<(), SyncError> {
    tokio::select! {
        scheduled = bulk.run_scheduled(every, shutdown.clone()) => {
            let runs = scheduled?;
            info!("Scheduled bulk sync finished after {} runs", runs);
        }
        monitored = monitor.run(shutdown) => match monitored {
            Ok(stats) => info!("Monitor exited after {} reconnects", stats.reconnects),
            Err(e) => {
                error!("Monitor stopped, stopping bulk sync too: {}", e);
                return Err(e);
            }
        },
    }
    Ok(())
}
