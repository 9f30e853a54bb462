//! In-process hub for transport and client tests.
//!
//! Speaks the handshake, records every command frame, answers `ping` with
//! `pong`, and hands all other commands to a reply function.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use url::Url;

pub(crate) const HUB_VERSION: &str = "2024.5.0";
pub(crate) const HUB_TOKEN: &str = "test-token";

/// How the hub answers one command.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// `success: true` with this result.
    Ok(Value),
    /// `success: false` with this code and message.
    Err(&'static str, &'static str),
    /// No answer at all.
    Silent,
}

type Handler = dyn Fn(&Value) -> Reply + Send + Sync;

struct HubState {
    handler: Box<Handler>,
    commands: Mutex<Vec<Value>>,
    connections: AtomicUsize,
    answer_pings: AtomicBool,
    accept_token: AtomicBool,
    kill: watch::Sender<u64>,
}

pub(crate) struct MockHub {
    url: Url,
    state: Arc<HubState>,
    task: JoinHandle<()>,
}

impl MockHub {
    /// Starts a hub answering every command with `null`.
    pub(crate) async fn start() -> Self {
        Self::with_handler(|_| Reply::Ok(Value::Null)).await
    }

    pub(crate) async fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (kill, _) = watch::channel(0);

        let state = Arc::new(HubState {
            handler: Box::new(handler),
            commands: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            answer_pings: AtomicBool::new(true),
            accept_token: AtomicBool::new(true),
            kill,
        });

        let accept_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    if let Ok(ws) = accept_async(stream).await {
                        serve(ws, state).await;
                    }
                });
            }
        });

        Self {
            url: Url::parse(&format!("http://{addr}")).expect("url"),
            state,
            task,
        }
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    /// Number of authenticated connections so far.
    pub(crate) fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Every command frame received, oldest first.
    pub(crate) fn commands(&self) -> Vec<Value> {
        self.state.commands.lock().clone()
    }

    /// Command frames of one type.
    pub(crate) fn commands_of(&self, command_type: &str) -> Vec<Value> {
        self.commands()
            .into_iter()
            .filter(|c| c["type"] == command_type)
            .collect()
    }

    pub(crate) fn set_answer_pings(&self, answer: bool) {
        self.state.answer_pings.store(answer, Ordering::SeqCst);
    }

    pub(crate) fn set_accept_token(&self, accept: bool) {
        self.state.accept_token.store(accept, Ordering::SeqCst);
    }

    /// Closes every open connection from the hub side.
    pub(crate) fn drop_connections(&self) {
        self.state.kill.send_modify(|n| *n += 1);
    }
}

impl Drop for MockHub {
    fn drop(&mut self) {
        self.task.abort();
        self.drop_connections();
    }
}

async fn serve(mut ws: WebSocketStream<TcpStream>, state: Arc<HubState>) {
    let mut kill = state.kill.subscribe();

    let greeting = json!({"type": "auth_required", "ha_version": HUB_VERSION});
    if ws.send(Message::Text(greeting.to_string().into())).await.is_err() {
        return;
    }

    let Some(auth) = next_json(&mut ws).await else {
        return;
    };
    let accepted =
        state.accept_token.load(Ordering::SeqCst) && auth["access_token"] == HUB_TOKEN;
    if !accepted {
        let invalid = json!({"type": "auth_invalid", "message": "Invalid access token"});
        let _ = ws.send(Message::Text(invalid.to_string().into())).await;
        let _ = ws.close(None).await;
        return;
    }

    let ok = json!({"type": "auth_ok", "ha_version": HUB_VERSION});
    if ws.send(Message::Text(ok.to_string().into())).await.is_err() {
        return;
    }
    state.connections.fetch_add(1, Ordering::SeqCst);

    loop {
        let frame = tokio::select! {
            frame = next_json(&mut ws) => frame,
            _ = kill.changed() => None,
        };
        let Some(frame) = frame else {
            let _ = ws.close(None).await;
            return;
        };

        state.commands.lock().push(frame.clone());
        let id = frame["id"].clone();

        let reply = if frame["type"] == "ping" {
            state
                .answer_pings
                .load(Ordering::SeqCst)
                .then(|| json!({"id": id, "type": "pong"}))
        } else {
            match (state.handler)(&frame) {
                Reply::Ok(result) => {
                    Some(json!({"id": id, "type": "result", "success": true, "result": result}))
                }
                Reply::Err(code, message) => Some(json!({
                    "id": id,
                    "type": "result",
                    "success": false,
                    "error": {"code": code, "message": message},
                })),
                Reply::Silent => None,
            }
        };

        if let Some(reply) = reply {
            if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}

async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Option<Value> {
    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => return serde_json::from_str(&text).ok(),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}
