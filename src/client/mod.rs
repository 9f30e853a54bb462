//! Client surface.
//!
//! This module provides the main entry point for talking to a hub.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HomeAssistant`] | Operation surface (trait) |
//! | [`HybridClient`] | Socket-first implementation with HTTP fallback |
//! | [`ClientBuilder`] | Fluent, validating configuration |
//! | [`ClientConfig`] | Validated configuration |
//!
//! # Example
//!
//! ```no_run
//! use hass_bridge::{ClientBuilder, HomeAssistant};
//!
//! # async fn example() -> hass_bridge::Result<()> {
//! let client = ClientBuilder::from_env().connect().await?;
//!
//! let kitchen = client.get_state("light.kitchen").await?;
//! println!("kitchen light is {}", kitchen.state);
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for client configuration.
pub mod builder;

/// Operation surface.
pub mod capability;

/// Hybrid dispatcher.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, ClientConfig, TOKEN_ENV_VAR, URL_ENV_VAR};
pub use capability::HomeAssistant;
pub use core::HybridClient;
