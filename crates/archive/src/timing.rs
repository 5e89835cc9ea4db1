//! Pacing and timestamp utilities
//!
//! The exporter pauses after each search page and each exported thread to
//! stay under the mail store's rate limits. Timestamp formatting for the
//! run log lives here too so every stamp uses the same UTC formats.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Fixed delay inserted between calls to rate-limited services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// A throttle that never sleeps
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Block the current thread for the configured delay
    pub fn pause(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

/// Row timestamp in the acquisition log, e.g. `2024-03-01T08:15:00Z`
pub fn log_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// File-name-safe run stamp, e.g. `20240301_081500Z`
pub fn run_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%SZ").to_string()
}
