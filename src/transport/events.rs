//! Transport lifecycle notifications.
//!
//! Delivered through a `tokio::sync::broadcast` channel obtained from
//! [`WsClient::subscribe`](super::WsClient::subscribe). Sending never blocks
//! the transport; slow receivers observe `RecvError::Lagged`.

use std::fmt;

/// Capacity of the lifecycle channel.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A change in connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A connection authenticated (initial or after reconnecting).
    Connected {
        /// Hub version from the handshake.
        ha_version: Option<String>,
    },

    /// The connection dropped.
    Disconnected {
        /// Why it dropped.
        reason: String,
    },

    /// A reconnection attempt is starting after its backoff wait.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
    },

    /// A reconnection attempt succeeded.
    Reconnected {
        /// Attempts it took.
        attempts: u32,
    },

    /// A reconnection attempt failed; another may follow.
    ReconnectFailed {
        /// 1-based attempt number.
        attempt: u32,
        /// Failure description.
        error: String,
    },

    /// The attempt budget is spent; no further attempts will be made.
    ReconnectExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// A heartbeat failed or went unacknowledged.
    HeartbeatFailed {
        /// Failure description.
        reason: String,
    },
}

impl fmt::Display for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { ha_version } => match ha_version {
                Some(version) => write!(f, "connected (hub {version})"),
                None => write!(f, "connected"),
            },
            Self::Disconnected { reason } => write!(f, "disconnected: {reason}"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Reconnected { attempts } => write!(f, "reconnected after {attempts} attempt(s)"),
            Self::ReconnectFailed { attempt, error } => {
                write!(f, "reconnect attempt {attempt} failed: {error}")
            }
            Self::ReconnectExhausted { attempts } => {
                write!(f, "gave up reconnecting after {attempts} attempt(s)")
            }
            Self::HeartbeatFailed { reason } => write!(f, "heartbeat failed: {reason}"),
        }
    }
}
