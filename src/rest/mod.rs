//! HTTP fallback for operations the realtime protocol lacks.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Bearer-authenticated request/response client |

// ============================================================================
// Submodules
// ============================================================================

/// Bearer-authenticated request/response client.
pub mod client;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{DEFAULT_HTTP_TIMEOUT, RestClient, rest_base_url};
