//! Home Assistant bridge - realtime transport and hybrid dispatch.
//!
//! This library talks to a Home Assistant hub over its persistent
//! WebSocket API, falling back to the HTTP API for the few operations the
//! socket protocol does not support.
//!
//! # Architecture
//!
//! - **Transport**: one authenticated socket, correlated commands, heartbeats,
//!   reconnection with exponential backoff
//! - **Fallback**: stateless bearer-authenticated HTTP client
//! - **Dispatcher**: [`HybridClient`] implements [`HomeAssistant`] by routing
//!   each operation to one of the two
//!
//! Key design principles:
//!
//! - A connection is either fully authenticated or absent
//! - Every pending command is resolved exactly once, even when the socket drops
//! - Reconnection attempts never run in parallel
//! - Lifecycle changes are published on a broadcast channel, never as errors
//!   on unrelated calls
//!
//! # Quick Start
//!
//! ```no_run
//! use hass_bridge::{HomeAssistant, HybridClient, Result, ServiceCall, Target};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = HybridClient::builder()
//!         .url("http://homeassistant.local:8123")
//!         .token("long-lived-token")
//!         .connect()
//!         .await?;
//!
//!     let call = ServiceCall::new("light", "turn_on")
//!         .with_target(Target::entities(["light.kitchen"]));
//!     client.call_service(call).await?;
//!
//!     for automation in client.list_automations().await? {
//!         println!("{} is {}", automation.entity_id, automation.state);
//!     }
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`HomeAssistant`] trait, [`HybridClient`], [`ClientBuilder`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Message ids, entity ids, access tokens |
//! | [`model`] | Entity, registry, media, statistics and target types |
//! | [`protocol`] | WebSocket frame types |
//! | [`rest`] | HTTP fallback client |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Operation surface and its hybrid implementation.
///
/// Use [`HybridClient::builder()`] to create a connected client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers for message sequence numbers, entity ids and tokens.
pub mod identifiers;

/// Value types exchanged with the hub.
pub mod model;

/// WebSocket protocol message types.
///
/// Defines the handshake, command and result frames.
pub mod protocol;

/// HTTP fallback client.
pub mod rest;

/// WebSocket transport layer.
///
/// Handshake, correlation, heartbeats and reconnection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, ClientConfig, HomeAssistant, HybridClient};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{AccessToken, EntityId, MessageId};

// Model types
pub use model::{
    AreaEntry, BrowseMedia, Context, DeviceEntry, Entity, EntityEntry, FloorEntry, HassConfig,
    HelperKind, LabelEntry, ServiceCall, StateUpdate, StatisticMetadata, StatisticValue,
    StatisticsPeriod, StatisticsQuery, Target, TargetExtraction,
};

// Protocol types
pub use protocol::Command;

// Fallback types
pub use rest::RestClient;

// Transport types
pub use transport::{ReconnectConfig, TransportEvent, TransportOptions, WsClient};
