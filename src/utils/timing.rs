// src/utils/timing.rs
//! Phase timing for sync runs.

use log::{debug, info};
use std::time::{Duration, Instant};

/// Measures a run and the phases inside it.
#[derive(Debug)]
pub struct Timer {
    start_time: Instant,
    operation_name: String,
    checkpoints: Vec<(String, Instant)>,
}

impl Timer {
    pub fn start(operation_name: &str) -> Self {
        debug!("Starting timer for: {}", operation_name);
        Self {
            start_time: Instant::now(),
            operation_name: operation_name.to_string(),
            checkpoints: Vec::new(),
        }
    }

    /// Marks the end of a phase.
    pub fn checkpoint(&mut self, checkpoint_name: &str) {
        let now = Instant::now();
        debug!(
            "{} - {}: {}ms",
            self.operation_name,
            checkpoint_name,
            now.duration_since(self.start_time).as_millis()
        );
        self.checkpoints.push((checkpoint_name.to_string(), now));
    }

    /// Per-phase durations, in checkpoint order.
    pub fn phases(&self) -> Vec<(String, Duration)> {
        let mut last_time = self.start_time;
        self.checkpoints
            .iter()
            .map(|(name, time)| {
                let segment = time.duration_since(last_time);
                last_time = *time;
                (name.clone(), segment)
            })
            .collect()
    }

    /// Logs the total and per-phase durations.
    pub fn finish(self) -> Duration {
        let total_duration = self.start_time.elapsed();
        info!(
            "{} completed in {}ms",
            self.operation_name,
            total_duration.as_millis()
        );
        for (name, segment) in self.phases() {
            info!("   {}: {}ms", name, segment.as_millis());
        }
        total_duration
    }
}
