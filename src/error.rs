//! Error types for the Home Assistant bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use hass_bridge::{HomeAssistant, Result};
//!
//! async fn example(client: &impl HomeAssistant) -> Result<()> {
//!     let light = client.get_state("light.kitchen").await?;
//!     println!("{} is {}", light.entity_id, light.state);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Handshake | [`Error::Authentication`], [`Error::Protocol`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::NotConnected`] |
//! | Remote | [`Error::Command`] |
//! | Execution | [`Error::RequestTimeout`], [`Error::Cancelled`] |
//! | Recovery | [`Error::MaxReconnectAttempts`] |
//! | Fallback HTTP | [`Error::NotFound`], [`Error::Unauthorized`], [`Error::Forbidden`], [`Error::Http`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Request`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::MessageId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument passed to an operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Handshake Errors
    // ========================================================================
    /// The hub rejected the access token (`auth_invalid`).
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Message embedded in the `auth_invalid` frame.
        message: String,
    },

    /// Protocol violation or unexpected frame.
    ///
    /// Returned when the handshake sequence or a frame format is invalid.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when dialing or writing to the socket fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Timed out while dialing or authenticating.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed while a command was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A command was issued while no authenticated connection exists.
    #[error("Not connected")]
    NotConnected,

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The hub answered a command with `success: false`.
    ///
    /// The connection stays up; only this command failed.
    #[error("Command failed ({code}): {message}")]
    Command {
        /// Remote error code (e.g. `not_found`, `invalid_format`).
        code: String,
        /// Remote error message.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Command request timeout.
    ///
    /// Returned when no response arrives within the caller's deadline.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: MessageId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The operation was cancelled by shutdown.
    #[error("Operation cancelled")]
    Cancelled,

    // ========================================================================
    // Recovery Errors
    // ========================================================================
    /// The reconnection attempt budget is spent.
    #[error("Maximum reconnection attempts ({attempts}) exceeded")]
    MaxReconnectAttempts {
        /// Number of attempts made.
        attempts: u32,
    },

    // ========================================================================
    // Fallback HTTP Errors
    // ========================================================================
    /// Remote object does not exist (HTTP 404).
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Identifier of the missing object.
        resource: String,
    },

    /// Access token rejected (HTTP 401).
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description returned by the hub.
        message: String,
    },

    /// Access token lacks permission (HTTP 403).
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description returned by the hub.
        message: String,
    },

    /// Any other unexpected HTTP status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or canonical reason.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP client error.
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[inline]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a remote command error.
    #[inline]
    pub fn command(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: MessageId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a max reconnect attempts error.
    #[inline]
    pub fn max_reconnect_attempts(attempts: u32) -> Self {
        Self::MaxReconnectAttempts { attempts }
    }

    /// Creates a not found error.
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates an HTTP status error.
    #[inline]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the remote side rejected the operation.
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Command { .. }
                | Self::NotFound { .. }
                | Self::Unauthorized { .. }
                | Self::Forbidden { .. }
                | Self::Http { .. }
        )
    }

    /// Returns `true` if the remote object does not exist.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Command { code, .. } => code == "not_found",
            _ => false,
        }
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::RequestTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
