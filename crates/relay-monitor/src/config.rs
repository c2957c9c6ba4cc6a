//! Monitor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between monitor passes.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the monitoring scheduler with sensible defaults.
///
/// The config is an immutable value captured at construction; the
/// scheduler never re-reads it while running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval between scheduler passes (optional).
    pub tick_interval: Option<Duration>,
}

impl MonitorConfig {
    /// Creates a new monitor configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_interval: None,
        }
    }

    /// Returns the tick interval, using the default if not set.
    #[inline]
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval.unwrap_or(DEFAULT_TICK_INTERVAL)
    }

    /// Sets the tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval == Some(Duration::ZERO) {
            return Err("Tick interval cannot be zero".to_string());
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}
