// src/orchestrator/monitor.rs
//! Live monitor: subscribe, extract pool creations, write them, reconnect on failure.

use crate::cache::{CacheWriter, LiveWriteOutcome, LiveWritePolicy};
use crate::error::{ReconnectPolicy, SyncError};
use crate::orchestrator::{Shutdown, StreamState};
use crate::streams::{PoolCreationExtractor, StreamEvent, UpdateFeed};
use futures::StreamExt;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Successful subscriptions, the first one included.
    pub connections: u32,
    pub reconnects: u32,
    pub transactions: u64,
    pub pools_found: u64,
    pub pools_written: u64,
}

pub struct Monitor {
    feed: Arc<dyn UpdateFeed>,
    extractor: PoolCreationExtractor,
    writer: CacheWriter,
    policy: ReconnectPolicy,
    live_policy: LiveWritePolicy,
    state: watch::Sender<StreamState>,
}

impl Monitor {
    pub fn new(
        feed: Arc<dyn UpdateFeed>,
        extractor: PoolCreationExtractor,
        writer: CacheWriter,
        policy: ReconnectPolicy,
        live_policy: LiveWritePolicy,
    ) -> Self {
        let (state, _) = watch::channel(StreamState::Connecting);
        Self {
            feed,
            extractor,
            writer,
            policy,
            live_policy,
            state,
        }
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    fn set_state(&self, next: StreamState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("Monitor: {:?} -> {:?}", previous, next);
        }
    }

    /// Runs until shutdown. Returns an error when the reconnect ceiling is
    /// reached or a failure is not recoverable (e.g. a bad endpoint).
    pub async fn run(&self, mut shutdown: Shutdown) -> Result<MonitorStats, SyncError> {
        let mut stats = MonitorStats::default();
        // consecutive failed connections, reset once a stream delivers
        let mut failures: u32 = 0;
        info!(
            "Monitoring programs {:?} via {}",
            self.extractor.layouts().program_ids(),
            self.feed.name()
        );

        loop {
            if shutdown.is_triggered() {
                break;
            }
            self.set_state(StreamState::Connecting);

            let subscribed = tokio::select! {
                result = self.feed.subscribe() => result,
                _ = shutdown.triggered() => break,
            };

            let failure = match subscribed {
                Ok(mut stream) => {
                    stats.connections += 1;
                    self.set_state(StreamState::Streaming);
                    info!("Streaming pool creations from {}", self.feed.name());

                    let outcome = loop {
                        tokio::select! {
                            next = stream.next() => match next {
                                Some(Ok(event)) => {
                                    failures = 0;
                                    self.handle_event(event, &mut stats).await;
                                }
                                Some(Err(e)) => break Err(e),
                                None => break Err(SyncError::Stream("stream closed by server".to_string())),
                            },
                            _ = shutdown.triggered() => break Ok(()),
                        }
                    };
                    match outcome {
                        Ok(()) => break,
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            failures += 1;
            error!(
                "Stream from {} failed ({:?}): {}",
                self.feed.name(),
                failure.categorize(),
                failure
            );
            if !failure.is_recoverable() {
                error!("Not reconnecting after unrecoverable failure");
                return Err(failure);
            }
            if self.policy.is_exhausted(failures) {
                error!("Giving up after {} consecutive failures", failures);
                return Err(SyncError::RetriesExhausted(failures));
            }

            let delay = self.policy.delay_for_attempt(failures);
            if !delay.is_zero() {
                warn!("Reconnecting in {:?} (attempt {})", delay, failures);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.triggered() => break,
                }
            }
            stats.reconnects += 1;
        }

        info!(
            "Monitor stopped: {} connections, {} transactions, {} pools found, {} written",
            stats.connections, stats.transactions, stats.pools_found, stats.pools_written
        );
        Ok(stats)
    }

    async fn handle_event(&self, event: StreamEvent, stats: &mut MonitorStats) {
        let StreamEvent::Transaction(tx) = event else { return };
        stats.transactions += 1;

        let Some(pool) = self.extractor.extract(&tx) else { return };
        stats.pools_found += 1;

        if self.writer.write_live(&pool, self.live_policy).await == LiveWriteOutcome::Written {
            stats.pools_written += 1;
        }
    }
}
