//! Engine configuration.
//!
//! Provides a type-safe builder for the timing knobs used by the bridge,
//! the DOM automation commands and the default HTTP fetcher.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use frame_replay::ReplayConfig;
//!
//! let config = ReplayConfig::new()
//!     .with_command_timeout(Duration::from_secs(10))
//!     .with_extension_version("2.4.0");
//!
//! assert!(config.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for one bridge request/reply round trip.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `waitForElement` timeout.
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default `waitForElement` poll interval.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// Delay between focusing an element and writing text into it.
const DEFAULT_FOCUS_SETTLE: Duration = Duration::from_millis(100);

/// Capture log records kept for diagnostics.
const DEFAULT_HISTORY_CAPACITY: usize = 256;

/// Default timeout for replayed HTTP requests.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// ReplayConfig
// ============================================================================

/// Configuration shared by the background engine and frame agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Maximum wait for a reply on the bridge.
    pub command_timeout: Duration,

    /// Default `waitForElement` timeout when the message omits one.
    pub wait_timeout: Duration,

    /// Default `waitForElement` poll interval when the message omits one.
    pub poll_interval: Duration,

    /// Pause after focusing an element before text input.
    pub focus_settle: Duration,

    /// Number of capture log records retained.
    pub history_capacity: usize,

    /// Timeout applied by [`crate::frame::HttpFetcher`].
    pub http_timeout: Duration,

    /// User agent for [`crate::frame::HttpFetcher`] (client default if `None`).
    pub user_agent: Option<String>,

    /// Extension version announced by the presence handshake.
    pub extension_version: String,
}

// ============================================================================
// Constructors
// ============================================================================

impl ReplayConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            focus_settle: DEFAULT_FOCUS_SETTLE,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: None,
            extension_version: String::new(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ReplayConfig {
    /// Sets the bridge reply timeout.
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the default element wait timeout.
    #[inline]
    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Sets the default element poll interval.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the focus settle delay for text input.
    #[inline]
    #[must_use]
    pub fn with_focus_settle(mut self, delay: Duration) -> Self {
        self.focus_settle = delay;
        self
    }

    /// Sets the capture log capacity.
    #[inline]
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Sets the HTTP timeout for the default fetcher.
    #[inline]
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Sets the user agent for the default fetcher.
    #[inline]
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the extension version used by the presence handshake.
    #[inline]
    #[must_use]
    pub fn with_extension_version(mut self, version: impl Into<String>) -> Self {
        self.extension_version = version.into();
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ReplayConfig {
    /// Checks that every duration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero timeout or poll interval.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout.is_zero() {
            return Err(Error::config("command timeout must be non-zero"));
        }
        if self.wait_timeout.is_zero() {
            return Err(Error::config("wait timeout must be non-zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::config("poll interval must be non-zero"));
        }
        if self.http_timeout.is_zero() {
            return Err(Error::config("http timeout must be non-zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReplayConfig::default();
        assert_eq!(config.command_timeout.as_secs(), 30);
        assert_eq!(config.wait_timeout.as_millis(), 10_000);
        assert_eq!(config.poll_interval.as_millis(), 1_000);
        assert_eq!(config.focus_settle.as_millis(), 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = ReplayConfig::new()
            .with_history_capacity(8)
            .with_user_agent("replay-test/1.0")
            .with_extension_version("1.2.3");

        assert_eq!(config.history_capacity, 8);
        assert_eq!(config.user_agent.as_deref(), Some("replay-test/1.0"));
        assert_eq!(config.extension_version, "1.2.3");
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = ReplayConfig::new().with_poll_interval(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
