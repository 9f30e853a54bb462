//! One authenticated socket and its event loop.
//!
//! A [`Connection`] is created after a successful handshake and lives until
//! the socket closes. Reconnection builds a new one; nothing is reused.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Outgoing frames queued by senders
//! - Inbound `result` and `pong` frames, routed to their pending slot by id
//! - Teardown: every pending slot is completed with
//!   [`Error::ConnectionClosed`] and the close reason is reported once
//!
//! # Pending Slots
//!
//! Each send registers a one-shot slot keyed by a fresh [`MessageId`]. A
//! guard removes the slot when the sending future finishes for any reason,
//! including being dropped by the caller.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{MessageId, MessageSequence};
use crate::protocol::{IncomingMessage, Request, Response};

use super::handshake::{Handshake, WsStream};

// ============================================================================
// Constants
// ============================================================================

/// Maximum pending requests before rejecting new ones.
pub const MAX_PENDING_REQUESTS: usize = 512;

// ============================================================================
// Types
// ============================================================================

/// Map of message ids to response channels.
type CorrelationMap = FxHashMap<MessageId, oneshot::Sender<Result<Response>>>;

/// Write half of the socket.
type WsSink = SplitSink<WsStream, Message>;

// ============================================================================
// CloseReason
// ============================================================================

/// Why the event loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The hub closed the socket or the stream ended.
    Remote,
    /// A read or write failed.
    Failed(String),
    /// [`Connection::shutdown`] was called.
    Shutdown,
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a serialized request.
    Write { id: MessageId, frame: String },
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// PendingGuard
// ============================================================================

/// Removes a pending slot when dropped.
struct PendingGuard<'a> {
    correlation: &'a Mutex<CorrelationMap>,
    id: MessageId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.correlation.lock().remove(&self.id).is_some() {
            trace!(id = %self.id, "Removed abandoned pending slot");
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Authenticated socket to the hub.
///
/// Handles request/response correlation over a spawned event loop.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and cheap to clone; clones share the same
/// socket, sequence counter and pending table.
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Message id counter for this socket.
    sequence: Arc<MessageSequence>,
    /// Cleared by the event loop on exit.
    alive: Arc<AtomicBool>,
    /// Hub version from the handshake.
    ha_version: Option<Arc<str>>,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
            sequence: Arc::clone(&self.sequence),
            alive: Arc::clone(&self.alive),
            ha_version: self.ha_version.clone(),
        }
    }
}

impl Connection {
    /// Wraps an authenticated socket and spawns its event loop.
    ///
    /// The returned receiver resolves once, when the loop exits.
    pub(crate) fn spawn(ws: WsStream, handshake: Handshake) -> (Self, oneshot::Receiver<CloseReason>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = oneshot::channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let alive = Arc::new(AtomicBool::new(true));

        tokio::spawn(Self::run_event_loop(
            ws,
            command_rx,
            Arc::clone(&correlation),
            Arc::clone(&alive),
            closed_tx,
        ));

        let connection = Self {
            command_tx,
            correlation,
            sequence: Arc::new(MessageSequence::new()),
            alive,
            ha_version: handshake.ha_version.map(Arc::from),
        };

        (connection, closed_rx)
    }

    /// Sends a command and waits for its `result` frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the event loop has stopped (no slot is registered)
    /// - [`Error::Protocol`] if too many requests are pending
    /// - [`Error::ConnectionClosed`] if the socket closes before the reply
    /// - [`Error::Connection`] if the frame cannot be written
    /// - [`Error::RequestTimeout`] if no reply arrives within `request_timeout`
    pub async fn send(
        &self,
        command_type: &str,
        params: Map<String, Value>,
        request_timeout: Duration,
    ) -> Result<Response> {
        self.dispatch(command_type, params, request_timeout, true)
            .await
    }

    /// Sends a control command (heartbeat) outside the pending-request cap.
    ///
    /// Backpressure from callers never blocks liveness checks.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), except that it is never rejected for
    /// too many pending requests.
    pub async fn send_control(
        &self,
        command_type: &str,
        params: Map<String, Value>,
        request_timeout: Duration,
    ) -> Result<Response> {
        self.dispatch(command_type, params, request_timeout, false)
            .await
    }

    async fn dispatch(
        &self,
        command_type: &str,
        params: Map<String, Value>,
        request_timeout: Duration,
        capped: bool,
    ) -> Result<Response> {
        let (id, response_rx) = self.register(capped)?;
        let _guard = PendingGuard {
            correlation: &self.correlation,
            id,
        };

        let frame = Request::new(id, command_type, params).to_frame()?;

        self.command_tx
            .send(ConnectionCommand::Write { id, frame })
            .map_err(|_| Error::ConnectionClosed)?;

        trace!(%id, command = command_type, "Request queued");

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                debug!(%id, command = command_type, "Request timed out");
                Err(Error::request_timeout(
                    id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Issues an id and registers its slot.
    ///
    /// The liveness check happens under the table lock so that a slot is
    /// never inserted after the event loop has drained the table.
    fn register(&self, capped: bool) -> Result<(MessageId, oneshot::Receiver<Result<Response>>)> {
        let mut correlation = self.correlation.lock();

        if !self.alive.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }

        if capped && correlation.len() >= MAX_PENDING_REQUESTS {
            warn!(
                pending = correlation.len(),
                max = MAX_PENDING_REQUESTS,
                "Too many pending requests"
            );
            return Err(Error::protocol(format!(
                "Too many pending requests: {}/{}",
                correlation.len(),
                MAX_PENDING_REQUESTS
            )));
        }

        let id = self.sequence.issue();
        let (response_tx, response_rx) = oneshot::channel();
        correlation.insert(id, response_tx);

        Ok((id, response_rx))
    }

    /// Returns `true` while the event loop is running.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Returns the last id issued on this socket.
    #[inline]
    #[must_use]
    pub fn last_message_id(&self) -> MessageId {
        self.sequence.last()
    }

    /// Returns the hub version reported during the handshake.
    #[inline]
    #[must_use]
    pub fn ha_version(&self) -> Option<&str> {
        self.ha_version.as_deref()
    }

    /// Asks the event loop to close the socket.
    ///
    /// Idempotent. Pending requests complete with
    /// [`Error::ConnectionClosed`].
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    // ========================================================================
    // Event Loop
    // ========================================================================

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        alive: Arc<AtomicBool>,
        closed_tx: oneshot::Sender<CloseReason>,
    ) {
        let (mut ws_write, mut ws_read) = ws.split();

        let reason = loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &correlation);
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by hub");
                            break CloseReason::Remote;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket read failed");
                            break CloseReason::Failed(e.to_string());
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break CloseReason::Remote;
                        }

                        // Binary, Ping, Pong
                        Some(Ok(_)) => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Write { id, frame }) => {
                            if let Err(reason) =
                                Self::handle_write(id, frame, &mut ws_write, &correlation).await
                            {
                                break reason;
                            }
                        }

                        Some(ConnectionCommand::Shutdown) | None => {
                            debug!("Shutdown requested");
                            let _ = ws_write.close().await;
                            break CloseReason::Shutdown;
                        }
                    }
                }
            }
        };

        alive.store(false, Ordering::SeqCst);
        Self::fail_pending_requests(&correlation);

        debug!(?reason, "Event loop terminated");
        let _ = closed_tx.send(reason);
    }

    /// Routes one inbound text frame.
    fn handle_incoming_message(text: &str, correlation: &Mutex<CorrelationMap>) {
        let message = match IncomingMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Failed to parse inbound frame");
                return;
            }
        };

        match message {
            IncomingMessage::Result(response) => Self::deliver(correlation, response),

            IncomingMessage::Pong { id } => {
                Self::deliver(correlation, Response::acknowledged(id));
            }

            IncomingMessage::Event { id, .. } => {
                trace!(subscription = ?id, "Event frame observed");
            }

            other => {
                debug!(kind = other.kind(), "Ignoring unexpected frame");
            }
        }
    }

    /// Completes the slot matching `response.id`.
    ///
    /// Replies with no slot (already timed out or abandoned) are dropped.
    fn deliver(correlation: &Mutex<CorrelationMap>, response: Response) {
        let id = response.id;
        let tx = correlation.lock().remove(&id);

        match tx {
            Some(tx) => {
                let _ = tx.send(Ok(response));
            }
            None => debug!(%id, "Dropping reply for unknown request"),
        }
    }

    /// Writes one frame, failing its slot if the write fails.
    async fn handle_write(
        id: MessageId,
        frame: String,
        ws_write: &mut WsSink,
        correlation: &Mutex<CorrelationMap>,
    ) -> std::result::Result<(), CloseReason> {
        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
            error!(%id, error = %e, "WebSocket write failed");
            if let Some(tx) = correlation.lock().remove(&id) {
                let _ = tx.send(Err(Error::connection(e.to_string())));
            }
            return Err(CloseReason::Failed(e.to_string()));
        }

        trace!(%id, "Request sent");
        Ok(())
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(correlation: &Mutex<CorrelationMap>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::{WebSocketStream, accept_async, connect_async};

    type HubSide = WebSocketStream<TcpStream>;

    /// Opens a loopback socket pair, skipping the handshake.
    async fn pair() -> (Connection, oneshot::Receiver<CloseReason>, HubSide) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            accept_async(stream).await.expect("upgrade")
        });

        let (client, _) = connect_async(format!("ws://{addr}/api/websocket"))
            .await
            .expect("connect");
        let hub = accept.await.expect("join");

        let handshake = Handshake {
            ha_version: Some("2024.5.0".into()),
        };
        let (connection, closed_rx) = Connection::spawn(client, handshake);
        (connection, closed_rx, hub)
    }

    /// Reads the next request frame on the hub side.
    async fn next_request(hub: &mut HubSide) -> Value {
        loop {
            let message = hub.next().await.expect("frame").expect("ok");
            if let Message::Text(text) = message {
                return serde_json::from_str(&text).expect("json");
            }
        }
    }

    async fn reply(hub: &mut HubSide, value: Value) {
        hub.send(Message::Text(value.to_string().into()))
            .await
            .expect("send");
    }

    const LONG: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_request_shape_and_result() {
        let (connection, _closed, mut hub) = pair().await;
        assert_eq!(connection.ha_version(), Some("2024.5.0"));

        let sender = connection.clone();
        let call = tokio::spawn(async move {
            let mut params = Map::new();
            params.insert("domain".into(), json!("light"));
            sender.send("call_service", params, LONG).await
        });

        let request = next_request(&mut hub).await;
        assert_eq!(request, json!({"id": 1, "type": "call_service", "domain": "light"}));

        reply(&mut hub, json!({"id": 1, "type": "result", "success": true, "result": {"ok": 1}})).await;

        let response = call.await.expect("join").expect("send");
        assert_eq!(response.result, Some(json!({"ok": 1})));
        assert_eq!(connection.pending_count(), 0);
        assert_eq!(connection.last_message_id(), MessageId::new(1));
    }

    #[tokio::test]
    async fn test_out_of_order_replies_reach_their_callers() {
        let (connection, _closed, mut hub) = pair().await;

        let first = connection.clone();
        let a = tokio::spawn(async move { first.send("get_states", Map::new(), LONG).await });
        let first_request = next_request(&mut hub).await;

        let second = connection.clone();
        let b = tokio::spawn(async move { second.send("get_config", Map::new(), LONG).await });
        let second_request = next_request(&mut hub).await;

        reply(&mut hub, json!({"id": second_request["id"], "type": "result", "success": true, "result": "config"})).await;
        reply(&mut hub, json!({"id": first_request["id"], "type": "result", "success": true, "result": "states"})).await;

        let a = a.await.expect("join").expect("a");
        let b = b.await.expect("join").expect("b");
        assert_eq!(a.result, Some(json!("states")));
        assert_eq!(b.result, Some(json!("config")));
    }

    #[tokio::test]
    async fn test_unknown_reply_is_dropped() {
        let (connection, _closed, mut hub) = pair().await;

        let sender = connection.clone();
        let call = tokio::spawn(async move { sender.send("get_states", Map::new(), LONG).await });
        let request = next_request(&mut hub).await;

        reply(&mut hub, json!({"id": 999, "type": "result", "success": true, "result": "stray"})).await;
        reply(&mut hub, json!({"id": request["id"], "type": "result", "success": true, "result": "mine"})).await;

        let response = call.await.expect("join").expect("send");
        assert_eq!(response.result, Some(json!("mine")));
        assert!(connection.is_alive());
    }

    #[tokio::test]
    async fn test_pong_completes_ping() {
        let (connection, _closed, mut hub) = pair().await;

        let sender = connection.clone();
        let call = tokio::spawn(async move { sender.send("ping", Map::new(), LONG).await });
        let request = next_request(&mut hub).await;
        assert_eq!(request["type"], "ping");

        reply(&mut hub, json!({"id": request["id"], "type": "pong"})).await;

        let response = call.await.expect("join").expect("pong");
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_timeout_removes_slot() {
        let (connection, _closed, mut hub) = pair().await;

        let err = connection
            .send("get_states", Map::new(), Duration::from_millis(50))
            .await
            .expect_err("should time out");
        assert!(matches!(err, Error::RequestTimeout { .. }));
        assert_eq!(connection.pending_count(), 0);

        // A late reply is harmless.
        let request = next_request(&mut hub).await;
        reply(&mut hub, json!({"id": request["id"], "type": "result", "success": true})).await;
        assert!(connection.is_alive());
    }

    #[tokio::test]
    async fn test_dropped_future_removes_slot() {
        let (connection, _closed, _hub) = pair().await;

        let outcome = timeout(
            Duration::from_millis(50),
            connection.send("get_states", Map::new(), LONG),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_close_fails_every_pending_request() {
        let (connection, closed, mut hub) = pair().await;

        let mut calls = Vec::new();
        for _ in 0..3 {
            let sender = connection.clone();
            calls.push(tokio::spawn(async move {
                sender.send("get_states", Map::new(), LONG).await
            }));
        }
        for _ in 0..3 {
            next_request(&mut hub).await;
        }
        assert_eq!(connection.pending_count(), 3);

        hub.close(None).await.expect("close");

        for call in calls {
            let err = call.await.expect("join").expect_err("should fail");
            assert!(matches!(err, Error::ConnectionClosed));
        }
        assert_eq!(closed.await.expect("reason"), CloseReason::Remote);
        assert!(!connection.is_alive());
        assert_eq!(connection.pending_count(), 0);

        let err = connection
            .send("get_states", Map::new(), LONG)
            .await
            .expect_err("not connected");
        assert!(matches!(err, Error::NotConnected));
        assert_eq!(connection.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_cap_rejects_excess() {
        let (connection, _closed, _hub) = pair().await;

        let slots: Vec<_> = (0..MAX_PENDING_REQUESTS)
            .map(|_| connection.register(true).expect("register"))
            .collect();
        assert_eq!(connection.pending_count(), MAX_PENDING_REQUESTS);

        let err = connection
            .send("get_states", Map::new(), LONG)
            .await
            .expect_err("over the cap");
        assert!(matches!(err, Error::Protocol { .. }));
        assert_eq!(connection.pending_count(), MAX_PENDING_REQUESTS);

        drop(slots);
    }

    #[tokio::test]
    async fn test_control_send_bypasses_pending_cap() {
        let (connection, _closed, mut hub) = pair().await;

        let slots: Vec<_> = (0..MAX_PENDING_REQUESTS)
            .map(|_| connection.register(true).expect("register"))
            .collect();

        let pinger = connection.clone();
        let ping = tokio::spawn(async move { pinger.send_control("ping", Map::new(), LONG).await });

        let request = next_request(&mut hub).await;
        assert_eq!(request["type"], "ping");
        reply(&mut hub, json!({"id": request["id"], "type": "pong"})).await;

        let response = ping.await.expect("join").expect("pong");
        assert!(response.success);
        assert!(connection.is_alive());
        assert_eq!(connection.pending_count(), MAX_PENDING_REQUESTS);

        drop(slots);
    }

    #[tokio::test]
    async fn test_shutdown_reports_reason() {
        let (connection, closed, _hub) = pair().await;

        connection.shutdown();
        connection.shutdown();

        assert_eq!(closed.await.expect("reason"), CloseReason::Shutdown);
        assert!(!connection.is_alive());
    }
}
