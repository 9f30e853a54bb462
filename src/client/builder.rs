//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and connecting a
//! [`HybridClient`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use hass_bridge::{ClientBuilder, TransportOptions};
//!
//! # async fn example() -> hass_bridge::Result<()> {
//! let client = ClientBuilder::new()
//!     .url("https://hass.example.com")
//!     .token("long-lived-token")
//!     .options(TransportOptions::new().with_request_timeout(Duration::from_secs(10)))
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Environment
//!
//! [`ClientBuilder::from_env`] reads `HASS_URL` and `HASS_TOKEN` once, at
//! the call site. Nothing is loaded lazily.

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::fmt;

use tracing::info;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::AccessToken;
use crate::rest::RestClient;
use crate::transport::{TransportOptions, WsClient};

use super::core::HybridClient;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the hub base URL.
pub const URL_ENV_VAR: &str = "HASS_URL";

/// Environment variable holding the access token.
pub const TOKEN_ENV_VAR: &str = "HASS_TOKEN";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for a [`HybridClient`].
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Hub base URL, unparsed.
    url: Option<String>,
    /// Access token.
    token: Option<AccessToken>,
    /// Transport options.
    options: TransportOptions,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("url", &self.url)
            .field("token", &self.token)
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default options and no endpoint.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from `HASS_URL` and `HASS_TOKEN`.
    ///
    /// Unset variables are left empty and reported by [`build`](Self::build).
    #[must_use]
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        if let Ok(url) = env::var(URL_ENV_VAR) {
            builder = builder.url(url);
        }
        if let Ok(token) = env::var(TOKEN_ENV_VAR) {
            builder = builder.token(token);
        }
        builder
    }

    /// Sets the hub base URL (`http`, `https`, `ws` or `wss`).
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the long-lived access token.
    #[inline]
    #[must_use]
    pub fn token(mut self, token: impl Into<AccessToken>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replaces the transport options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the configuration without connecting.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL or token is missing or blank
    /// - [`Error::Config`] if the URL does not parse or has another scheme
    /// - [`Error::Config`] if the options are invalid
    pub fn build(self) -> Result<ClientConfig> {
        let url = self.validate_url()?;
        let token = self.validate_token()?;
        self.options.validate()?;

        Ok(ClientConfig {
            url,
            token,
            options: self.options,
        })
    }

    /// Validates, connects the socket, and composes the client.
    ///
    /// # Errors
    ///
    /// Everything [`build`](Self::build) reports, plus the connection errors
    /// of [`WsClient::connect`].
    pub async fn connect(self) -> Result<HybridClient> {
        self.build()?.connect().await
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    fn validate_url(&self) -> Result<Url> {
        let raw = self.url.as_deref().map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(Error::config(format!(
                "Hub URL is required. Use .url() or set {URL_ENV_VAR}.\n\
                 Example: ClientBuilder::new().url(\"http://homeassistant.local:8123\")"
            )));
        }

        let url = Url::parse(raw)
            .map_err(|e| Error::config(format!("Invalid hub URL '{raw}': {e}")))?;

        match url.scheme() {
            "http" | "https" | "ws" | "wss" => Ok(url),
            other => Err(Error::config(format!(
                "Unsupported URL scheme '{other}', expected http, https, ws or wss"
            ))),
        }
    }

    fn validate_token(&self) -> Result<AccessToken> {
        match &self.token {
            Some(token) if !token.is_blank() => Ok(token.clone()),
            _ => Err(Error::config(format!(
                "Access token is required. Use .token() or set {TOKEN_ENV_VAR}."
            ))),
        }
    }
}

// ============================================================================
// ClientConfig
// ============================================================================

/// Validated client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hub URL.
    pub url: Url,
    /// Access token.
    pub token: AccessToken,
    /// Transport options.
    pub options: TransportOptions,
}

impl ClientConfig {
    /// Connects the socket and builds the HTTP fallback.
    ///
    /// # Errors
    ///
    /// Connection and handshake errors of [`WsClient::connect`], or
    /// [`Error::Request`] if the HTTP client cannot be built.
    pub async fn connect(self) -> Result<HybridClient> {
        let rest = RestClient::new(&self.url, self.token.clone(), self.options.request_timeout)?;
        let ws = WsClient::connect(&self.url, self.token, self.options).await?;

        info!(endpoint = %ws.endpoint(), rest = %rest.base_url(), "Client connected");

        Ok(HybridClient::from_parts(ws, rest))
    }
}

// ============================================================================
// Tests
// ============================================================================
