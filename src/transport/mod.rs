//! WebSocket transport layer.
//!
//! This module handles the long-lived socket to the hub's realtime API:
//! handshake, request correlation, heartbeats and reconnection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                        ┌─────────────────┐
//! │  WsClient            │                        │  Hub            │
//! │                      │       WebSocket        │                 │
//! │  handshake::open ────┼───────────────────────►│  /api/websocket │
//! │  → Connection        │◄──────────────────────►│                 │
//! │  heartbeat loop      │   {"id":n,"type":..}   │                 │
//! │  ReconnectionManager │                        │                 │
//! └──────────────────────┘                        └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `handshake::open` - Dial and authenticate
//! 2. `Connection` - Correlate commands and replies
//! 3. Heartbeat loop - Ping every interval, flag stale connections
//! 4. On loss - Fail pending commands, back off, dial a new `Connection`
//! 5. `WsClient::close` - Cancel, stop heartbeat, close socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Supervising client |
//! | `connection` | Socket event loop and pending table |
//! | `events` | Lifecycle notifications |
//! | `handshake` | Dial and authentication |
//! | `health` | Heartbeat staleness tracking |
//! | `options` | Transport configuration |
//! | `reconnect` | Backoff state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Supervising client.
pub mod client;

/// Socket event loop and pending table.
pub mod connection;

/// Lifecycle notifications.
pub mod events;

/// Dial and authentication.
pub mod handshake;

/// Heartbeat staleness tracking.
pub mod health;

/// Transport configuration.
pub mod options;

/// Backoff state machine.
pub mod reconnect;

#[cfg(test)]
pub(crate) mod mock_hub;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::WsClient;
pub use connection::{CloseReason, Connection, MAX_PENDING_REQUESTS};
pub use events::TransportEvent;
pub use handshake::{Handshake, websocket_url};
pub use health::HealthMonitor;
pub use options::TransportOptions;
pub use reconnect::{ReconnectConfig, ReconnectionManager};
