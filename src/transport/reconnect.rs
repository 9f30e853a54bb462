//! Reconnection backoff state machine.
//!
//! Decoupled from socket I/O: the transport only asks
//! [`ReconnectionManager::should_reconnect`] and awaits
//! [`ReconnectionManager::wait_for_reconnect`].
//!
//! # Backoff
//!
//! The Nth wait lasts `min(initial_delay × multiplier^(N-1), max_delay)`:
//!
//! ```text
//! initial=100ms, multiplier=2, max=1s
//! 100ms → 200ms → 400ms → 800ms → 1s → 1s → ...
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default delay before the first reconnection attempt.
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for the backoff delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default backoff multiplier.
const DEFAULT_MULTIPLIER: f64 = 2.0;

// ============================================================================
// ReconnectConfig
// ============================================================================

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Upper bound for any delay.
    pub max_delay: Duration,
    /// Growth factor applied after each attempt.
    pub multiplier: f64,
    /// Attempt budget, `0` means unlimited.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectConfig {
    /// Creates the default configuration (1s, 60s, ×2, unlimited).
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_attempts: 0,
        }
    }

    /// Sets the initial delay.
    #[inline]
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the multiplier.
    #[inline]
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the attempt budget (`0` = unlimited).
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns the delay used for attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..attempt {
            delay = next_delay(delay, self.multiplier, self.max_delay);
            if delay == self.max_delay {
                break;
            }
        }
        delay
    }
}

/// Advances a delay by `multiplier`, capped at `max`.
fn next_delay(current: Duration, multiplier: f64, max: Duration) -> Duration {
    let next = current.as_nanos() as f64 * multiplier;
    if !next.is_finite() || next >= max.as_nanos() as f64 {
        return max;
    }
    Duration::from_nanos(next.max(0.0).round() as u64)
}

// ============================================================================
// ReconnectState
// ============================================================================

/// Mutable backoff state.
#[derive(Debug)]
struct ReconnectState {
    attempts: u32,
    current_delay: Duration,
}

// ============================================================================
// ReconnectionManager
// ============================================================================

/// Backoff state machine with a single-attempt guard.
///
/// # Thread Safety
///
/// State is behind a mutex that is never held across `.await`. The
/// in-progress flag is a compare-and-swap so concurrent triggers collapse
/// into one attempt.
#[derive(Debug)]
pub struct ReconnectionManager {
    config: ReconnectConfig,
    state: Mutex<ReconnectState>,
    in_progress: AtomicBool,
}

impl ReconnectionManager {
    /// Creates a manager in its reset state.
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            state: Mutex::new(ReconnectState {
                attempts: 0,
                current_delay: config.initial_delay.min(config.max_delay),
            }),
            config,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Returns `true` if another attempt is allowed.
    #[must_use]
    pub fn should_reconnect(&self) -> bool {
        self.config.max_attempts == 0 || self.state.lock().attempts < self.config.max_attempts
    }

    /// Waits out the current backoff delay before the next attempt.
    ///
    /// Increments the attempt counter, sleeps for the current delay, then
    /// advances the delay for the following call. Returns the 1-based
    /// attempt number.
    ///
    /// # Errors
    ///
    /// - [`Error::MaxReconnectAttempts`] if the budget is spent
    /// - [`Error::Cancelled`] if `cancel` fires during the wait
    pub async fn wait_for_reconnect(&self, cancel: &CancellationToken) -> Result<u32> {
        let (attempt, delay) = {
            let mut state = self.state.lock();
            if self.config.max_attempts > 0 && state.attempts >= self.config.max_attempts {
                return Err(Error::max_reconnect_attempts(state.attempts));
            }
            state.attempts += 1;
            (state.attempts, state.current_delay)
        };

        debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting before reconnect");

        tokio::select! {
            () = cancel.cancelled() => return Err(Error::Cancelled),
            () = sleep(delay) => {}
        }

        let mut state = self.state.lock();
        state.current_delay = next_delay(
            state.current_delay,
            self.config.multiplier,
            self.config.max_delay,
        );

        Ok(attempt)
    }

    /// Restores the initial state after a successful connection.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.attempts = 0;
        state.current_delay = self.config.initial_delay.min(self.config.max_delay);
    }

    /// Returns the number of attempts since the last reset.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.state.lock().attempts
    }

    /// Returns the delay the next wait will use.
    #[inline]
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.state.lock().current_delay
    }

    /// Claims the single reconnection slot.
    ///
    /// Returns `None` if a reconnection is already underway. The slot is
    /// released when the guard drops.
    #[must_use]
    pub fn try_begin(&self) -> Option<ReconnectGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReconnectGuard { manager: self })
    }

    /// Returns `true` while a reconnection holds the slot.
    #[inline]
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

// ============================================================================
// ReconnectGuard
// ============================================================================

/// Holds the reconnection slot; releases it on drop.
#[derive(Debug)]
pub struct ReconnectGuard<'a> {
    manager: &'a ReconnectionManager,
}

impl Drop for ReconnectGuard<'_> {
    fn drop(&mut self) {
        self.manager.in_progress.store(false, Ordering::Release);
    }
}

// ============================================================================
// Tests
// ============================================================================
