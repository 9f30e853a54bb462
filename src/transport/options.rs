//! Transport configuration.
//!
//! | Option | Default | Effect |
//! |--------|---------|--------|
//! | `request_timeout` | 30s | Deadline for `send_command` without an explicit timeout |
//! | `connect_timeout` | 10s | Bound on dial plus handshake |
//! | `heartbeat_interval` | 30s | Ping period, zero disables the health monitor |
//! | `heartbeat_timeout` | 10s | Deadline for each ping, added to the staleness window |
//! | `auto_reconnect` | `true` | Reconnect after a dropped connection |
//! | `reconnect` | 1s / 60s / x2 / unlimited | Backoff parameters |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

use super::reconnect::ReconnectConfig;

// ============================================================================
// Constants
// ============================================================================

/// Default command deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default dial-plus-handshake deadline.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default heartbeat deadline.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// TransportOptions
// ============================================================================

/// Configuration for [`WsClient`](super::WsClient).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use hass_bridge::TransportOptions;
///
/// let options = TransportOptions::new()
///     .with_request_timeout(Duration::from_secs(10))
///     .with_heartbeat_interval(Duration::ZERO);
///
/// assert!(!options.heartbeat_enabled());
/// ```
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Default deadline for commands.
    pub request_timeout: Duration,

    /// Deadline for dialing and authenticating.
    pub connect_timeout: Duration,

    /// Heartbeat period. Zero disables heartbeats.
    pub heartbeat_interval: Duration,

    /// Deadline for each heartbeat round-trip.
    pub heartbeat_timeout: Duration,

    /// Reconnect automatically after the connection drops.
    pub auto_reconnect: bool,

    /// Backoff parameters.
    pub reconnect: ReconnectConfig,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportOptions {
    /// Creates options with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            auto_reconnect: true,
            reconnect: ReconnectConfig::new(),
        }
    }

    /// Sets the default command deadline.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the dial-plus-handshake deadline.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the heartbeat period. `Duration::ZERO` disables heartbeats.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the heartbeat deadline.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the backoff parameters.
    #[inline]
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Returns `true` if the health monitor runs.
    #[inline]
    #[must_use]
    pub fn heartbeat_enabled(&self) -> bool {
        !self.heartbeat_interval.is_zero()
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a timeout is zero or the backoff
    /// parameters are inconsistent.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::config("request_timeout must be greater than zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect_timeout must be greater than zero"));
        }
        if self.heartbeat_enabled() && self.heartbeat_timeout.is_zero() {
            return Err(Error::config(
                "heartbeat_timeout must be greater than zero when heartbeats are enabled",
            ));
        }
        if !self.reconnect.multiplier.is_finite() || self.reconnect.multiplier < 1.0 {
            return Err(Error::config(format!(
                "reconnect multiplier must be at least 1.0, got {}",
                self.reconnect.multiplier
            )));
        }
        if self.reconnect.initial_delay > self.reconnect.max_delay {
            return Err(Error::config(
                "reconnect initial_delay must not exceed max_delay",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
