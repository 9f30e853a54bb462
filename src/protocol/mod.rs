//! WebSocket protocol message types.
//!
//! This module defines the frame format exchanged with the hub's realtime
//! API.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `AuthMessage` | Client → Hub | Handshake credential |
//! | `Request` | Client → Hub | Command with `id` |
//! | `Response` | Hub → Client | `result` frame for an `id` |
//! | `IncomingMessage` | Hub → Client | Any inbound frame, by `type` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Typed command definitions |
//! | `message` | Handshake frames and inbound classification |
//! | `request` | Request and Response types |

// ============================================================================
// Constants
// ============================================================================

/// Maximum inbound frame size (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

// ============================================================================
// Submodules
// ============================================================================

/// Typed command definitions.
pub mod command;

/// Handshake frames and inbound classification.
pub mod message;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::Command;
pub use message::{AuthMessage, IncomingMessage};
pub use request::{RemoteError, Request, Response};
