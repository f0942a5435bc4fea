//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vtag_core::constants::{DEFAULT_HISTORY_SIZE, DEFAULT_POLL_INTERVAL_MS};
use vtag_core::{Error, Result};

/// Tunables of a reader session.
///
/// Missing fields fall back to their defaults when deserializing, so a
/// config file only needs to name what it changes.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vtag_emulator::SessionConfig;
///
/// let config = SessionConfig::from_json(r#"{ "poll_interval_ms": 50 }"#).unwrap();
/// assert_eq!(config.poll_interval(), Duration::from_millis(50));
/// assert_eq!(config.history_size, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay between two status samples, in milliseconds.
    pub poll_interval_ms: u64,

    /// Number of state transitions kept for inspection.
    pub history_size: usize,
}

impl SessionConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the JSON is malformed or the values are
    /// out of range.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check that the values can drive a session.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the poll interval or the history size is
    /// zero.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.history_size == 0 {
            return Err(Error::Config(
                "history_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}
