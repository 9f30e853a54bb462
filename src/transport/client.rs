//! Socket client with supervision.
//!
//! [`WsClient`] owns the current [`Connection`], replaces it on
//! reconnection, and runs the heartbeat loop.
//!
//! # Background Tasks
//!
//! | Task | Per | Stops when |
//! |------|-----|------------|
//! | event loop | connection | socket closes |
//! | close watcher | connection | event loop exits |
//! | heartbeat | connection | failure, replacement, or shutdown |
//! | reconnect | drop | success, exhaustion, or shutdown |
//!
//! Every connection gets a generation number. Watchers and heartbeats carry
//! the generation they were started for and ignore anything that happens
//! after their connection has been replaced.
//!
//! # Shutdown
//!
//! [`WsClient::close`] cancels the lifetime token, stops the heartbeat,
//! halts reconnection and closes the socket, in that order. Dropping the
//! last handle does the same.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{AccessToken, MessageId};
use crate::protocol::{Command, Response};

use super::connection::{CloseReason, Connection};
use super::events::{EVENT_CHANNEL_CAPACITY, TransportEvent};
use super::handshake::{self, Handshake, WsStream};
use super::health::HealthMonitor;
use super::options::TransportOptions;
use super::reconnect::ReconnectionManager;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for a client.
struct WsClientInner {
    /// Realtime endpoint (`ws://` or `wss://`).
    endpoint: Url,
    /// Access token for every handshake.
    token: AccessToken,
    /// Transport configuration.
    options: TransportOptions,
    /// Current connection, replaced on reconnect.
    connection: RwLock<Option<Connection>>,
    /// Incremented for every installed connection.
    generation: AtomicU64,
    /// Set on install, cleared on loss or close.
    connected: AtomicBool,
    /// Backoff state and single-attempt guard.
    reconnect: ReconnectionManager,
    /// Heartbeat acknowledgement tracker.
    health: HealthMonitor,
    /// Heartbeat task for the current connection.
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    /// Lifetime signal fired by `close`.
    shutdown: CancellationToken,
    /// Lifecycle notifications.
    events: broadcast::Sender<TransportEvent>,
}

/// Shuts the client down when the last user handle drops.
///
/// Background tasks hold the inner state but never this guard.
struct ShutdownGuard {
    inner: Arc<WsClientInner>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.inner.shutdown_now();
    }
}

// ============================================================================
// WsClient
// ============================================================================

/// Client for the hub's realtime API.
///
/// Cheap to clone; clones share the connection.
///
/// # Example
///
/// ```no_run
/// use hass_bridge::{AccessToken, Command, TransportOptions, WsClient};
///
/// # async fn example() -> hass_bridge::Result<()> {
/// let url = url::Url::parse("http://homeassistant.local:8123")?;
/// let client = WsClient::connect(&url, AccessToken::new("token"), TransportOptions::new()).await?;
///
/// let states = client.send(Command::GetStates).await?;
/// println!("{} entities", states.as_array().map_or(0, Vec::len));
///
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WsClient {
    /// Shared inner state.
    inner: Arc<WsClientInner>,
    /// Dropped with the last clone.
    _guard: Arc<ShutdownGuard>,
}

// ============================================================================
// WsClient - Display
// ============================================================================

impl fmt::Debug for WsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsClient")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("connected", &self.is_connected())
            .field("generation", &self.inner.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WsClient - Constructor
// ============================================================================

impl WsClient {
    /// Dials the hub, authenticates, and starts supervision.
    ///
    /// `url` may be the hub's `http(s)` base URL or its `ws(s)` endpoint.
    /// A failed initial connection is returned to the caller and is not
    /// retried.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` are invalid or the scheme is unsupported
    /// - [`Error::Authentication`] if the token is rejected
    /// - [`Error::Protocol`] if the handshake is out of sequence
    /// - [`Error::Connection`] / [`Error::ConnectionTimeout`] if the hub is unreachable
    pub async fn connect(url: &Url, token: AccessToken, options: TransportOptions) -> Result<Self> {
        options.validate()?;
        let endpoint = handshake::websocket_url(url)?;

        let (ws, handshake) = handshake::open(&endpoint, &token, options.connect_timeout).await?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(WsClientInner {
            endpoint,
            token,
            reconnect: ReconnectionManager::new(options.reconnect),
            health: HealthMonitor::new(options.heartbeat_interval, options.heartbeat_timeout),
            options,
            connection: RwLock::new(None),
            generation: AtomicU64::new(0),
            connected: AtomicBool::new(false),
            heartbeat: Mutex::new(None),
            shutdown: CancellationToken::new(),
            events,
        });

        inner.install(ws, handshake)?;

        Ok(Self {
            _guard: Arc::new(ShutdownGuard {
                inner: Arc::clone(&inner),
            }),
            inner,
        })
    }
}

// ============================================================================
// WsClient - Commands
// ============================================================================

impl WsClient {
    /// Sends a typed command with the default deadline.
    ///
    /// # Errors
    ///
    /// See [`send_command_with_timeout`](Self::send_command_with_timeout).
    pub async fn send(&self, command: Command) -> Result<Value> {
        self.send_with_timeout(command, self.inner.options.request_timeout)
            .await
    }

    /// Sends a typed command with an explicit deadline.
    ///
    /// # Errors
    ///
    /// See [`send_command_with_timeout`](Self::send_command_with_timeout).
    pub async fn send_with_timeout(&self, command: Command, timeout: Duration) -> Result<Value> {
        let (command_type, params) = command.into_parts()?;
        self.send_command_with_timeout(&command_type, params, timeout)
            .await
    }

    /// Sends a command by name with the default deadline.
    ///
    /// # Errors
    ///
    /// See [`send_command_with_timeout`](Self::send_command_with_timeout).
    pub async fn send_command(&self, command_type: &str, params: Map<String, Value>) -> Result<Value> {
        self.send_command_with_timeout(command_type, params, self.inner.options.request_timeout)
            .await
    }

    /// Sends a command by name and returns its `result` payload.
    ///
    /// Dropping the returned future abandons the request and frees its
    /// pending slot.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no live connection
    /// - [`Error::Command`] if the hub answers `success: false`
    /// - [`Error::RequestTimeout`] if no reply arrives within `timeout`
    /// - [`Error::ConnectionClosed`] if the connection drops first
    pub async fn send_command_with_timeout(
        &self,
        command_type: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Value> {
        self.inner
            .send_raw(command_type, params, timeout)
            .await?
            .into_result()
    }
}

// ============================================================================
// WsClient - Lifecycle
// ============================================================================

impl WsClient {
    /// Reconnects now, using the same backoff and guard as automatic
    /// reconnection.
    ///
    /// Returns `Ok(false)` if a reconnection is already underway.
    ///
    /// # Errors
    ///
    /// - [`Error::MaxReconnectAttempts`] if the attempt budget runs out
    /// - [`Error::Cancelled`] if the client is closed meanwhile
    pub async fn reconnect(&self) -> Result<bool> {
        self.inner.reconnect().await
    }

    /// Closes the client. Idempotent.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for a graceful close
    /// handshake.
    pub async fn close(&self) -> Result<()> {
        self.inner.shutdown_now();
        Ok(())
    }

    /// Subscribes to lifecycle notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.inner.events.subscribe()
    }
}

// ============================================================================
// WsClient - Accessors
// ============================================================================

impl WsClient {
    /// Returns `true` if an authenticated connection is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.current().is_some()
    }

    /// Returns `true` if connected and heartbeats are current.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.inner.health.is_healthy(self.is_connected())
    }

    /// Returns `true` while a reconnection is underway.
    #[inline]
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.inner.reconnect.is_reconnecting()
    }

    /// Returns the number of commands awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .connection
            .read()
            .as_ref()
            .map_or(0, Connection::pending_count)
    }

    /// Returns the hub version reported by the current connection.
    #[must_use]
    pub fn ha_version(&self) -> Option<String> {
        self.inner
            .connection
            .read()
            .as_ref()
            .and_then(|c| c.ha_version().map(str::to_string))
    }

    /// Returns the last message id issued on the current connection.
    #[must_use]
    pub fn last_message_id(&self) -> Option<MessageId> {
        self.inner
            .connection
            .read()
            .as_ref()
            .map(Connection::last_message_id)
    }

    /// Returns the realtime endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Returns the transport options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &TransportOptions {
        &self.inner.options
    }
}

// ============================================================================
// WsClientInner - Connection Management
// ============================================================================

impl WsClientInner {
    /// Returns the live connection, if any.
    fn current(&self) -> Option<Connection> {
        if !self.connected.load(Ordering::SeqCst) {
            return None;
        }
        self.connection
            .read()
            .as_ref()
            .filter(|c| c.is_alive())
            .cloned()
    }

    async fn send_raw(
        &self,
        command_type: &str,
        params: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Response> {
        let connection = self.current().ok_or(Error::NotConnected)?;
        connection.send(command_type, params, timeout).await
    }

    /// Sends a heartbeat outside the pending-request cap.
    async fn send_ping(&self, timeout: Duration) -> Result<Response> {
        let connection = self.current().ok_or(Error::NotConnected)?;
        let (command_type, params) = Command::Ping.into_parts()?;
        connection.send_control(&command_type, params, timeout).await
    }

    /// Makes a freshly authenticated socket the current connection.
    ///
    /// The cancellation check and the swap happen under the connection
    /// lock, which `shutdown_now` also takes, so nothing is installed after
    /// a close.
    fn install(self: &Arc<Self>, ws: WsStream, handshake: Handshake) -> Result<()> {
        let ha_version = handshake.ha_version.clone();
        let (connection, closed_rx) = Connection::spawn(ws, handshake);

        let (generation, previous) = {
            let mut slot = self.connection.write();
            if self.shutdown.is_cancelled() {
                drop(slot);
                connection.shutdown();
                return Err(Error::Cancelled);
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let previous = slot.replace(connection);
            self.connected.store(true, Ordering::SeqCst);
            (generation, previous)
        };
        if let Some(previous) = previous {
            previous.shutdown();
        }

        self.reconnect.reset();
        self.health.mark_fresh();

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let reason = closed_rx
                .await
                .unwrap_or_else(|_| CloseReason::Failed("event loop stopped".into()));
            inner.connection_lost(generation, describe(&reason));
        });

        self.start_heartbeat(generation);

        debug!(generation, "Connection installed");
        self.emit(TransportEvent::Connected { ha_version });
        Ok(())
    }

    /// Handles the loss of the connection with the given generation.
    fn connection_lost(self: &Arc<Self>, generation: u64, reason: String) {
        if self.shutdown.is_cancelled() || self.generation.load(Ordering::SeqCst) != generation {
            trace!(generation, "Ignoring loss of superseded connection");
            return;
        }
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }

        warn!(generation, reason = %reason, "Connection lost");

        if let Some(connection) = self.connection.read().as_ref() {
            connection.shutdown();
        }
        self.emit(TransportEvent::Disconnected { reason });

        if self.options.auto_reconnect {
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                match inner.reconnect().await {
                    Ok(_) => {}
                    Err(Error::Cancelled) => debug!("Reconnection cancelled by shutdown"),
                    Err(e) => warn!(error = %e, "Automatic reconnection stopped"),
                }
            });
        }
    }

    /// Runs guarded reconnection until success, exhaustion or shutdown.
    async fn reconnect(self: &Arc<Self>) -> Result<bool> {
        let Some(_guard) = self.reconnect.try_begin() else {
            debug!("Reconnection already in progress");
            return Ok(false);
        };

        if self.shutdown.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if self.connected.swap(false, Ordering::SeqCst) {
            if let Some(connection) = self.connection.read().as_ref() {
                connection.shutdown();
            }
            self.emit(TransportEvent::Disconnected {
                reason: "reconnect requested".into(),
            });
        }

        loop {
            if !self.reconnect.should_reconnect() {
                let attempts = self.reconnect.attempts();
                warn!(attempts, "Reconnection attempts exhausted");
                self.emit(TransportEvent::ReconnectExhausted { attempts });
                return Err(Error::max_reconnect_attempts(attempts));
            }

            let attempt = self.reconnect.wait_for_reconnect(&self.shutdown).await?;

            self.emit(TransportEvent::Reconnecting { attempt });
            info!(attempt, endpoint = %self.endpoint, "Reconnecting");

            let result = tokio::select! {
                result = handshake::open(&self.endpoint, &self.token, self.options.connect_timeout) => result,
                () = self.shutdown.cancelled() => Err(Error::Cancelled),
            };

            match result {
                Ok((ws, handshake)) => {
                    self.install(ws, handshake)?;
                    info!(attempt, "Reconnected");
                    self.emit(TransportEvent::Reconnected { attempts: attempt });
                    return Ok(true);
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    warn!(attempt, error = %e, "Reconnection attempt failed");
                    self.emit(TransportEvent::ReconnectFailed {
                        attempt,
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    /// Cancels, stops the heartbeat, and closes the socket. Idempotent.
    fn shutdown_now(&self) {
        self.shutdown.cancel();

        if let Some(handle) = self.heartbeat.lock().take() {
            handle.abort();
        }

        let (connection, was_connected) = {
            let mut slot = self.connection.write();
            (slot.take(), self.connected.swap(false, Ordering::SeqCst))
        };
        if let Some(connection) = connection {
            connection.shutdown();
        }

        if was_connected {
            info!(endpoint = %self.endpoint, "Client closed");
            self.emit(TransportEvent::Disconnected {
                reason: "client closed".into(),
            });
        }
    }

    fn emit(&self, event: TransportEvent) {
        trace!(%event, "Transport event");
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

// ============================================================================
// WsClientInner - Heartbeat
// ============================================================================

impl WsClientInner {
    /// Starts the heartbeat loop for `generation`, replacing any previous one.
    fn start_heartbeat(self: &Arc<Self>, generation: u64) {
        if !self.health.is_enabled() {
            return;
        }

        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move { inner.heartbeat_loop(generation).await });

        let previous = self.heartbeat.lock().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn heartbeat_loop(self: Arc<Self>, generation: u64) {
        let interval = self.health.interval();
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.shutdown.cancelled() => break,
            }

            if self.generation.load(Ordering::SeqCst) != generation
                || !self.connected.load(Ordering::SeqCst)
            {
                break;
            }

            if self.health.is_stale() {
                let since = self.health.since_last_ack();
                self.heartbeat_failed(
                    generation,
                    format!("no acknowledgement for {}ms", since.as_millis()),
                );
                break;
            }

            match self
                .send_ping(self.health.timeout())
                .await
                .and_then(|response| response.into_result())
            {
                Ok(_) => {
                    self.health.record_ack();
                    trace!(generation, "Heartbeat acknowledged");
                }
                Err(_) if self.shutdown.is_cancelled() => break,
                Err(e) => {
                    self.heartbeat_failed(generation, e.to_string());
                    break;
                }
            }
        }

        trace!(generation, "Heartbeat loop stopped");
    }

    fn heartbeat_failed(self: &Arc<Self>, generation: u64, reason: String) {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        warn!(generation, reason = %reason, "Heartbeat failed");
        self.emit(TransportEvent::HeartbeatFailed {
            reason: reason.clone(),
        });
        self.connection_lost(generation, reason);
    }
}

/// Human-readable close reason.
fn describe(reason: &CloseReason) -> String {
    match reason {
        CloseReason::Remote => "closed by hub".to_string(),
        CloseReason::Failed(message) => message.clone(),
        CloseReason::Shutdown => "connection shut down".to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
