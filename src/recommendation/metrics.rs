//! Timing for recommendation queries

use std::time::{Duration, Instant};

/// Drop guard that logs how long an operation took.
///
/// Completion is logged at debug level; runs longer than the configured
/// threshold are logged at warn level instead.
pub struct PerformanceTimer {
    start: Instant,
    label: &'static str,
    slow_threshold: Option<Duration>,
}

impl PerformanceTimer {
    pub fn new(label: &'static str) -> Self {
        Self {
            start: Instant::now(),
            label,
            slow_threshold: None,
        }
    }

    pub fn with_threshold(label: &'static str, threshold: Duration) -> Self {
        Self {
            start: Instant::now(),
            label,
            slow_threshold: Some(threshold),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_slow(&self) -> bool {
        self.slow_threshold
            .is_some_and(|threshold| self.elapsed() > threshold)
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        if self.is_slow() {
            tracing::warn!(
                "⚠️ Slow operation: {} took {:?} (threshold: {:?})",
                self.label,
                elapsed,
                self.slow_threshold.unwrap_or_default()
            );
        } else {
            tracing::debug!("⏱️ {} completed in {:?}", self.label, elapsed);
        }
    }
}
