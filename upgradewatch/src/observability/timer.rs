//! Elapsed-time measurement on the tokio clock.

use std::time::Duration;
use tokio::time::Instant;

/// Simple elapsed-time helper for stages and waits.
///
/// Reads `tokio::time::Instant`, so tests running on a paused clock see exact
/// tick multiples.
#[derive(Debug, Clone, Copy)]
pub struct StageTimer {
    start: Instant,
}

impl StageTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the instant the timer started.
    #[must_use]
    pub const fn started(&self) -> Instant {
        self.start
    }

    /// Returns the elapsed time.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}
