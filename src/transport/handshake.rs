//! Dial and authenticate.
//!
//! # Connection Flow
//!
//! 1. Map the base URL to the realtime endpoint (`http→ws`, `https→wss`)
//! 2. Dial with a 16 MiB frame limit
//! 3. Read `auth_required`
//! 4. Send `{"type":"auth","access_token":...}`
//! 5. Read `auth_ok` (done) or `auth_invalid` (fail)
//!
//! Any failure after the socket opens closes it with a protocol-error status.
//! A half-authenticated socket is never returned.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::AccessToken;
use crate::protocol::{AuthMessage, IncomingMessage, MAX_FRAME_SIZE};

// ============================================================================
// Constants
// ============================================================================

/// Path of the realtime endpoint.
const WEBSOCKET_PATH: &str = "/api/websocket";

// ============================================================================
// Types
// ============================================================================

/// Client-side socket type.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outcome of a completed handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    /// Hub version reported during the handshake.
    pub ha_version: Option<String>,
}

// ============================================================================
// URL Mapping
// ============================================================================

/// Maps a hub base URL to its realtime endpoint.
///
/// `http` becomes `ws`, `https` becomes `wss`; `ws`/`wss` are kept. The
/// `/api/websocket` path is appended unless already present.
///
/// # Errors
///
/// Returns [`Error::Config`] for any other scheme.
pub fn websocket_url(base: &Url) -> Result<Url> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(Error::config(format!(
                "unsupported URL scheme '{other}', expected http, https, ws or wss"
            )));
        }
    };

    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("cannot use scheme '{scheme}' for {base}")))?;

    let path = url.path().trim_end_matches('/').to_string();
    if !path.ends_with(WEBSOCKET_PATH) {
        url.set_path(&format!("{path}{WEBSOCKET_PATH}"));
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

// ============================================================================
// Handshake
// ============================================================================

/// Dials `url` and completes the authentication handshake.
///
/// Both the dial and the handshake are bounded by `connect_timeout`.
///
/// # Errors
///
/// - [`Error::ConnectionTimeout`] if dialing or authenticating takes too long
/// - [`Error::Connection`] if the socket cannot be opened
/// - [`Error::Authentication`] if the hub answers `auth_invalid`
/// - [`Error::Protocol`] on any out-of-sequence frame
pub async fn open(
    url: &Url,
    token: &AccessToken,
    connect_timeout: Duration,
) -> Result<(WsStream, Handshake)> {
    let timeout_ms = connect_timeout.as_millis() as u64;
    let config = WebSocketConfig::default()
        .max_message_size(Some(MAX_FRAME_SIZE))
        .max_frame_size(Some(MAX_FRAME_SIZE));

    debug!(url = %url, "Dialing hub");

    let (mut ws, _) = timeout(
        connect_timeout,
        connect_async_with_config(url.as_str(), Some(config), false),
    )
    .await
    .map_err(|_| Error::connection_timeout(timeout_ms))?
    .map_err(|e| Error::connection(format!("WebSocket dial failed: {e}")))?;

    match timeout(connect_timeout, authenticate(&mut ws, token)).await {
        Ok(Ok(handshake)) => {
            info!(url = %url, ha_version = ?handshake.ha_version, "Authenticated with hub");
            Ok((ws, handshake))
        }
        Ok(Err(e)) => {
            fail_closed(&mut ws, &e).await;
            Err(e)
        }
        Err(_) => {
            let e = Error::connection_timeout(timeout_ms);
            fail_closed(&mut ws, &e).await;
            Err(e)
        }
    }
}

/// Runs the three-frame authentication sequence.
async fn authenticate(ws: &mut WsStream, token: &AccessToken) -> Result<Handshake> {
    let announced_version = match read_frame(ws).await? {
        IncomingMessage::AuthRequired { ha_version } => ha_version,
        other => {
            return Err(Error::protocol(format!(
                "expected auth_required, got {}",
                other.kind()
            )));
        }
    };

    let frame = AuthMessage::new(token.expose()).to_frame()?;
    ws.send(Message::Text(frame.into())).await?;

    match read_frame(ws).await? {
        IncomingMessage::AuthOk { ha_version } => Ok(Handshake {
            ha_version: ha_version.or(announced_version),
        }),
        IncomingMessage::AuthInvalid { message } => Err(Error::authentication(
            message.unwrap_or_else(|| "invalid access token".to_string()),
        )),
        other => Err(Error::protocol(format!(
            "expected auth_ok or auth_invalid, got {}",
            other.kind()
        ))),
    }
}

/// Reads the next text frame, skipping control frames.
async fn read_frame(ws: &mut WsStream) -> Result<IncomingMessage> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return IncomingMessage::parse(&text)
                    .map_err(|e| Error::protocol(format!("malformed handshake frame: {e}")));
            }
            Some(Ok(Message::Close(_))) | None => return Err(Error::ConnectionClosed),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Closes the socket with a protocol-error status.
async fn fail_closed(ws: &mut WsStream, cause: &Error) {
    warn!(error = %cause, "Handshake failed, closing socket");

    let frame = CloseFrame {
        code: CloseCode::Protocol,
        reason: "handshake failed".into(),
    };
    if let Err(e) = ws.close(Some(frame)).await {
        debug!(error = %e, "Close after failed handshake did not complete");
    }
}

// ============================================================================
// Tests
// ============================================================================
