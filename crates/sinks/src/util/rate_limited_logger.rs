//! Rate-limited error logging utility
//!
//! Hot-path failures (full queues, disk errors) can repeat thousands of
//! times per second. This logs at most once per interval and reports how
//! many occurrences were suppressed in between.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval for rate-limited logging
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Rate-limited logger scoped to one component
pub struct RateLimitedLogger {
    /// Component name included in every log line
    component: String,

    /// Minimum interval between log messages
    min_interval: Duration,

    /// Last time we logged
    last_log_time: Mutex<Option<Instant>>,

    /// Occurrences since last log
    pending: AtomicU64,

    /// Occurrences ever recorded
    total: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a logger with the given interval
    pub fn new(component: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            component: component.into(),
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Create a logger with the default interval
    pub fn with_default_interval(component: impl Into<String>) -> Self {
        Self::new(component, DEFAULT_LOG_INTERVAL)
    }

    /// Record a failure and log it if the interval has elapsed
    ///
    /// Returns true if the failure was logged, false if suppressed.
    pub fn warn(&self, message: &str, error: &dyn Display) -> bool {
        self.pending.fetch_add(1, Ordering::Relaxed);
        let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;

        if !self.should_log() {
            return false;
        }

        let count = self.pending.swap(0, Ordering::Relaxed);
        tracing::warn!(
            component = %self.component,
            error = %error,
            suppressed = count.saturating_sub(1),
            total,
            "{message}"
        );
        true
    }

    fn should_log(&self) -> bool {
        let mut last_time = self.last_log_time.lock();
        let now = Instant::now();

        match *last_time {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                *last_time = Some(now);
                true
            }
        }
    }

    /// Total failures recorded
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_failure_logged() {
        let logger = RateLimitedLogger::with_default_interval("queue:live");
        assert!(logger.warn("event dropped", &"queue full"));
        assert_eq!(logger.total(), 1);
    }

    #[test]
    fn test_burst_suppressed() {
        let logger = RateLimitedLogger::new("disk:archive", Duration::from_secs(60));

        assert!(logger.warn("write failed", &"disk full"));
        for _ in 0..99 {
            assert!(!logger.warn("write failed", &"disk full"));
        }
        assert_eq!(logger.total(), 100);
    }

    #[test]
    fn test_logs_again_after_interval() {
        let logger = RateLimitedLogger::new("disk:archive", Duration::from_millis(10));

        assert!(logger.warn("write failed", &"disk full"));
        assert!(!logger.warn("write failed", &"disk full"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(logger.warn("write failed", &"disk full"));
    }
}
