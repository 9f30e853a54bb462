//! Heartbeat state.
//!
//! The monitor only records when the last heartbeat was acknowledged and
//! answers whether that is recent enough. The ping loop itself lives with
//! the client that owns the connection.
//!
//! A connection is stale once `now - last_ack > interval + timeout`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

// ============================================================================
// HealthMonitor
// ============================================================================

/// Heartbeat acknowledgement tracker.
#[derive(Debug)]
pub struct HealthMonitor {
    interval: Duration,
    timeout: Duration,
    last_ack: Mutex<Instant>,
}

impl HealthMonitor {
    /// Creates a monitor. A zero `interval` disables heartbeats.
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            last_ack: Mutex::new(Instant::now()),
        }
    }

    /// Returns `true` if heartbeats run.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Heartbeat period.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Deadline for each heartbeat.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Records a successful heartbeat.
    pub fn record_ack(&self) {
        *self.last_ack.lock() = Instant::now();
    }

    /// Treats a fresh connection as just acknowledged.
    pub fn mark_fresh(&self) {
        self.record_ack();
    }

    /// Time since the last acknowledgement.
    #[must_use]
    pub fn since_last_ack(&self) -> Duration {
        self.last_ack.lock().elapsed()
    }

    /// Returns `true` if the last acknowledgement is older than
    /// `interval + timeout`.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.since_last_ack() > self.interval + self.timeout
    }

    /// Liveness predicate.
    ///
    /// | Connected | Heartbeats | Result |
    /// |-----------|------------|--------|
    /// | no | any | `false` |
    /// | yes | disabled | `true` |
    /// | yes | enabled | `!is_stale()` |
    #[must_use]
    pub fn is_healthy(&self, connected: bool) -> bool {
        if !connected {
            return false;
        }
        if !self.is_enabled() {
            return true;
        }
        !self.is_stale()
    }
}

// ============================================================================
// Tests
// ============================================================================
