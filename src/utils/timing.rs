//! Pass timing for quote computations.

use log::{debug, warn};
use std::time::{Duration, Instant};

/// Measures one evaluation pass, with named checkpoints for its stages.
#[derive(Debug)]
pub struct Timer {
    start_time: Instant,
    operation_name: String,
    checkpoints: Vec<(&'static str, Instant)>,
}

impl Timer {
    pub fn start(operation_name: impl Into<String>) -> Self {
        Self {
            start_time: Instant::now(),
            operation_name: operation_name.into(),
            checkpoints: Vec::new(),
        }
    }

    pub fn checkpoint(&mut self, checkpoint_name: &'static str) {
        self.checkpoints.push((checkpoint_name, Instant::now()));
    }

    /// Logs the stage breakdown at debug level and warns past `threshold`.
    pub fn finish_with_threshold(self, threshold: Duration) -> Duration {
        let total_duration = self.start_time.elapsed();

        let mut last_time = self.start_time;
        for (name, time) in &self.checkpoints {
            debug!(
                "{} - {}: {}us",
                self.operation_name,
                name,
                time.duration_since(last_time).as_micros()
            );
            last_time = *time;
        }
        debug!(
            "{} completed in {}us",
            self.operation_name,
            total_duration.as_micros()
        );

        if total_duration > threshold {
            warn!(
                "{} took {}ms (exceeds threshold of {}ms)",
                self.operation_name,
                total_duration.as_millis(),
                threshold.as_millis()
            );
        }

        total_duration
    }
}
