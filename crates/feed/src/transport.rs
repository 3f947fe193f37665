//! Transport abstraction for the streaming connection
//!
//! The client only needs to send text frames, receive text frames and close.
//! [`WsConnector`] does that over a real WebSocket; [`ScriptedConnector`]
//! replays canned sessions in-process for tests and dry runs.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use url::Url;

use crate::error::{FeedError, FeedResult};
use crate::protocol::{METHOD_AUTH, METHOD_SET_HEARTBEAT, METHOD_SUBSCRIBE, METHOD_TEST};

/// One open connection.
#[async_trait]
pub trait FeedTransport: Send {
    async fn send(&mut self, text: String) -> FeedResult<()>;

    /// Next text frame. `None` means the server closed the connection.
    async fn recv(&mut self) -> FeedResult<Option<String>>;

    async fn close(&mut self);
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: FeedTransport;

    async fn connect(&self, url: &Url) -> FeedResult<Self::Transport>;
}

// ==================== WebSocket Implementation ====================

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &Url) -> FeedResult<WsTransport> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| FeedError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(WsTransport { stream })
    }
}

#[async_trait]
impl FeedTransport for WsTransport {
    async fn send(&mut self, text: String) -> FeedResult<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> FeedResult<Option<String>> {
        while let Some(message) = self.stream.next().await {
            match message.map_err(|e| FeedError::Transport(e.to_string()))? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => trace!("Ignoring non-UTF-8 binary frame"),
                },
                Message::Ping(payload) => {
                    self.stream
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| FeedError::Transport(e.to_string()))?;
                }
                Message::Close(frame) => {
                    debug!(?frame, "Server sent close frame");
                    return Ok(None);
                }
                Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            trace!(error = %e, "Error while closing WebSocket");
        }
    }
}

// ==================== Scripted Implementation ====================

/// How a scripted session ends once its notifications are drained.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    /// Server closes the connection.
    Close,
    /// Server goes silent; reads block until the client times out.
    Silent,
    /// Transport fails with this message.
    Error(String),
}

/// Canned behavior for one connection.
#[derive(Debug, Clone)]
pub struct SessionScript {
    pub reject_auth: bool,
    pub reject_subscribe: bool,
    /// Frames pushed to the client after the subscription is acknowledged.
    pub notifications: Vec<String>,
    pub end: SessionEnd,
}

impl SessionScript {
    pub fn new(notifications: Vec<String>, end: SessionEnd) -> Self {
        Self {
            reject_auth: false,
            reject_subscribe: false,
            notifications,
            end,
        }
    }

    pub fn closing(notifications: Vec<String>) -> Self {
        Self::new(notifications, SessionEnd::Close)
    }

    pub fn silent(notifications: Vec<String>) -> Self {
        Self::new(notifications, SessionEnd::Silent)
    }

    pub fn rejecting_auth() -> Self {
        Self {
            reject_auth: true,
            ..Self::closing(Vec::new())
        }
    }
}

#[derive(Debug, Default)]
struct ScriptLog {
    connects: Vec<Instant>,
    sent: Vec<String>,
}

/// Replays one [`SessionScript`] per connect, then refuses further connects.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    sessions: Arc<Mutex<VecDeque<SessionScript>>>,
    log: Arc<Mutex<ScriptLog>>,
}

impl ScriptedConnector {
    pub fn new(sessions: Vec<SessionScript>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(sessions.into())),
            log: Arc::new(Mutex::new(ScriptLog::default())),
        }
    }

    /// Times at which connections were opened.
    pub fn connect_times(&self) -> Vec<Instant> {
        self.log.lock().connects.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connect_times().len()
    }

    /// Every frame the client sent, across all sessions.
    pub fn sent(&self) -> Vec<String> {
        self.log.lock().sent.clone()
    }

    /// Methods of every request the client sent, in order.
    pub fn sent_methods(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|text| serde_json::from_str::<Value>(text).ok())
            .filter_map(|v| v.get("method").and_then(Value::as_str).map(str::to_string))
            .collect()
    }
}

pub struct ScriptedTransport {
    script: SessionScript,
    inbox: VecDeque<String>,
    log: Arc<Mutex<ScriptLog>>,
    closed: bool,
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, _url: &Url) -> FeedResult<ScriptedTransport> {
        let script = self
            .sessions
            .lock()
            .pop_front()
            .ok_or_else(|| FeedError::Connect("no scripted sessions left".to_string()))?;
        self.log.lock().connects.push(Instant::now());
        Ok(ScriptedTransport {
            script,
            inbox: VecDeque::new(),
            log: self.log.clone(),
            closed: false,
        })
    }
}

impl ScriptedTransport {
    fn reply(&mut self, id: Value, result: Value) {
        self.inbox
            .push_back(json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string());
    }

    fn reject(&mut self, id: Value, code: i64, message: &str) {
        self.inbox.push_back(
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
                .to_string(),
        );
    }
}

#[async_trait]
impl FeedTransport for ScriptedTransport {
    async fn send(&mut self, text: String) -> FeedResult<()> {
        if self.closed {
            return Err(FeedError::Transport("send on closed transport".to_string()));
        }
        let request: Value = serde_json::from_str(&text)?;
        self.log.lock().sent.push(text);

        let id = request.get("id").cloned().unwrap_or(Value::Null);
        match request.get("method").and_then(Value::as_str) {
            Some(METHOD_AUTH) if self.script.reject_auth => {
                self.reject(id, 13004, "invalid_credentials")
            }
            Some(METHOD_AUTH) => self.reply(
                id,
                json!({"access_token": "scripted", "token_type": "bearer"}),
            ),
            Some(METHOD_SUBSCRIBE) if self.script.reject_subscribe => {
                self.reject(id, 11050, "bad_request")
            }
            Some(METHOD_SUBSCRIBE) => {
                let channels = request
                    .get("params")
                    .and_then(|p| p.get("channels"))
                    .cloned()
                    .unwrap_or(Value::Null);
                self.reply(id, channels);
                let notifications = std::mem::take(&mut self.script.notifications);
                self.inbox.extend(notifications);
            }
            Some(METHOD_SET_HEARTBEAT) | Some(METHOD_TEST) => {
                self.reply(id, json!("ok"));
            }
            _ => self.reject(id, -32601, "method not found"),
        }
        Ok(())
    }

    async fn recv(&mut self) -> FeedResult<Option<String>> {
        if let Some(frame) = self.inbox.pop_front() {
            return Ok(Some(frame));
        }
        match &self.script.end {
            SessionEnd::Close => Ok(None),
            SessionEnd::Error(message) => Err(FeedError::Transport(message.clone())),
            SessionEnd::Silent => std::future::pending::<FeedResult<Option<String>>>().await,
        }
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}
