//! Poll timing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest interval a poller will sleep between evaluations.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Interval and timeout for one condition wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Time between evaluations.
    pub interval: Duration,
    /// Total time allowed, measured from the first evaluation.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollConfig {
    /// Creates a new poll config.
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Creates a poll config from whole seconds.
    #[must_use]
    pub const fn from_secs(interval: u64, timeout: u64) -> Self {
        Self::new(Duration::from_secs(interval), Duration::from_secs(timeout))
    }

    /// Sets the interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The interval actually slept, never below [`MIN_INTERVAL`].
    #[must_use]
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(MIN_INTERVAL)
    }

    /// Upper bound on evaluations: `ceil(timeout / interval) + 1`.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        let interval = self.effective_interval().as_nanos();
        let ticks = self.timeout.as_nanos().div_ceil(interval);
        u32::try_from(ticks).map_or(u32::MAX, |t| t.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.max_attempts(), 31);
    }

    #[test]
    fn test_max_attempts_rounds_up() {
        assert_eq!(PollConfig::from_secs(30, 45 * 60).max_attempts(), 91);
        assert_eq!(PollConfig::from_secs(10, 25).max_attempts(), 4);
        assert_eq!(PollConfig::from_secs(10, 0).max_attempts(), 1);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = PollConfig::default().with_interval(Duration::ZERO);
        assert_eq!(config.effective_interval(), MIN_INTERVAL);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = PollConfig::from_secs(30, 1800);
        let json = serde_json::to_value(config).unwrap();
        assert_eq!(json["interval"]["secs"], 30);
        let back: PollConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
