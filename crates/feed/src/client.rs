//! Trade feed client
//!
//! Owns one streaming connection at a time and drives it through
//! connect, authenticate, subscribe and listen. Any failure along the way
//! ends the session; the outer loop waits a fixed delay and starts over.
//! Only a stop signal or an invalid URL ends [`FeedClient::run_forever`].

use std::time::Duration;

use async_trait::async_trait;
use common::Trade;
use observability::FeedMetrics;
use serde_json::Value;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{FeedError, FeedResult};
use crate::protocol::{self, Inbound, RpcError};
use crate::transport::{Connector, FeedTransport};

/// Connection settings for the streaming API.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    pub url: String,
    pub asset: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub heartbeat_interval_secs: u64,
    /// Must be longer than the heartbeat interval.
    pub read_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl FeedSettings {
    pub fn from_config(venue: &config::VenueConfig, feed: &config::FeedConfig) -> Self {
        Self {
            url: venue.ws_url.clone(),
            asset: venue.asset.clone(),
            client_id: venue.client_id.clone(),
            client_secret: venue.client_secret.clone(),
            heartbeat_interval_secs: feed.heartbeat_interval_seconds,
            read_timeout: feed.read_timeout(),
            reconnect_delay: feed.reconnect_delay(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Subscribing,
    Listening,
    Reconnecting(Duration),
    Stopped,
}

/// How a single connect-to-disconnect session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    Stopped,
    Recoverable(FeedError),
    Fatal(FeedError),
}

impl From<FeedError> for SessionOutcome {
    fn from(e: FeedError) -> Self {
        if e.is_fatal() {
            SessionOutcome::Fatal(e)
        } else {
            SessionOutcome::Recoverable(e)
        }
    }
}

/// Why the handler is being polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollReason {
    /// Listening just started on a fresh session.
    SessionStart,
    /// An inbound frame was handled.
    MessageProcessed,
    /// The read timed out with nothing received.
    Idle,
}

/// Receives what the client pulls off the feed.
#[async_trait]
pub trait FeedHandler: Send {
    async fn on_trade(&mut self, trade: Trade);

    /// Records in a notification that were malformed or not options.
    async fn on_dropped(&mut self, _count: usize) {}

    /// Called after every receive attempt while listening.
    async fn on_poll(&mut self, reason: PollReason);
}

/// Per-session counters, logged when the session ends.
#[derive(Debug, Clone, Copy)]
pub struct SessionStats {
    pub started: Instant,
    pub trades: u64,
}

impl SessionStats {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            trades: 0,
        }
    }

    pub fn runtime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn trades_per_minute(&self) -> f64 {
        let minutes = self.runtime().as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.trades as f64 / minutes
        } else {
            0.0
        }
    }
}

pub struct FeedClient<C: Connector> {
    connector: C,
    settings: FeedSettings,
    state: ConnectionState,
    next_id: u64,
    metrics: FeedMetrics,
}

impl<C: Connector> FeedClient<C> {
    pub fn new(connector: C, settings: FeedSettings, metrics: FeedMetrics) -> Self {
        Self {
            connector,
            settings,
            state: ConnectionState::Disconnected,
            next_id: 0,
            metrics,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "Feed state change");
            self.state = next;
        }
    }

    fn next_request_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Run sessions until `stop` is cancelled.
    ///
    /// Returns `Err` only for fatal errors.
    pub async fn run_forever<H: FeedHandler>(
        &mut self,
        handler: &mut H,
        stop: CancellationToken,
    ) -> FeedResult<()> {
        loop {
            if stop.is_cancelled() {
                self.transition(ConnectionState::Stopped);
                return Ok(());
            }

            match self.run_session(handler, &stop).await {
                SessionOutcome::Stopped => {
                    self.transition(ConnectionState::Stopped);
                    return Ok(());
                }
                SessionOutcome::Fatal(e) => {
                    error!(error = %e, "Feed stopped on fatal error");
                    self.transition(ConnectionState::Stopped);
                    return Err(e);
                }
                SessionOutcome::Recoverable(e) => {
                    let delay = self.settings.reconnect_delay;
                    warn!(error = %e, delay_secs = delay.as_secs(), "Feed session ended, reconnecting");
                    self.metrics.reconnect();
                    self.transition(ConnectionState::Reconnecting(delay));
                    tokio::select! {
                        _ = stop.cancelled() => {
                            self.transition(ConnectionState::Stopped);
                            return Ok(());
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn run_session<H: FeedHandler>(
        &mut self,
        handler: &mut H,
        stop: &CancellationToken,
    ) -> SessionOutcome {
        let mut transport = match self.connect_and_authenticate().await {
            Ok(transport) => transport,
            Err(e) => {
                self.transition(ConnectionState::Disconnected);
                return e.into();
            }
        };

        // Heartbeats go first so that nothing but trades follows the subscription ack.
        let heartbeat = self.settings.heartbeat_interval_secs;
        let mut stats = SessionStats::new();
        let outcome = match self.enable_heartbeat(&mut transport, heartbeat).await {
            Ok(()) => match self.subscribe(&mut transport).await {
                Ok(()) => self.listen(&mut transport, handler, stop, &mut stats).await,
                Err(e) => e.into(),
            },
            Err(e) => e.into(),
        };

        transport.close().await;
        self.metrics.set_connected(false);
        self.transition(ConnectionState::Disconnected);
        info!(
            runtime_secs = stats.runtime().as_secs(),
            trades = stats.trades,
            trades_per_minute = stats.trades_per_minute(),
            "Feed session ended"
        );
        outcome
    }

    /// Open the transport and authenticate with client credentials.
    pub async fn connect_and_authenticate(&mut self) -> FeedResult<C::Transport> {
        self.transition(ConnectionState::Connecting);
        let url = Url::parse(&self.settings.url).map_err(|e| FeedError::InvalidUrl {
            url: self.settings.url.clone(),
            message: e.to_string(),
        })?;
        let mut transport = self.connector.connect(&url).await?;
        info!(url = %url, "Connected to feed");

        self.transition(ConnectionState::Authenticating);
        let (Some(client_id), Some(client_secret)) = (
            self.settings.client_id.clone(),
            self.settings.client_secret.clone(),
        ) else {
            transport.close().await;
            return Err(FeedError::MissingCredentials);
        };

        let id = self.next_request_id();
        let result = match self
            .request(
                &mut transport,
                id,
                protocol::METHOD_AUTH,
                protocol::auth_request(id, &client_id, &client_secret)?,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                transport.close().await;
                return Err(e);
            }
        };
        if let Err(e) = result {
            transport.close().await;
            return Err(FeedError::AuthRejected(e.to_string()));
        }

        info!("Authenticated");
        Ok(transport)
    }

    /// Subscribe to the asset's option trade channel.
    pub async fn subscribe(&mut self, transport: &mut C::Transport) -> FeedResult<()> {
        self.transition(ConnectionState::Subscribing);
        let channels = vec![protocol::trade_channel(&self.settings.asset)];
        let id = self.next_request_id();
        let request = protocol::subscribe_request(id, &channels)?;
        self.request(transport, id, protocol::METHOD_SUBSCRIBE, request)
            .await?
            .map_err(|e| FeedError::SubscribeRejected(e.to_string()))?;
        info!(channels = ?channels, "Subscribed");
        Ok(())
    }

    /// Ask the server to probe liveness every `interval_secs`.
    pub async fn enable_heartbeat(
        &mut self,
        transport: &mut C::Transport,
        interval_secs: u64,
    ) -> FeedResult<()> {
        let id = self.next_request_id();
        let request = protocol::set_heartbeat_request(id, interval_secs)?;
        self.request(transport, id, protocol::METHOD_SET_HEARTBEAT, request)
            .await?
            .map_err(|e| FeedError::RequestRejected {
                method: protocol::METHOD_SET_HEARTBEAT.to_string(),
                message: e.to_string(),
            })?;
        info!(interval_secs, "Heartbeat enabled");
        Ok(())
    }

    /// Receive until the connection drops or `stop` is cancelled.
    ///
    /// A read timeout is a liveness check, not an error: the client sends a
    /// probe and keeps listening.
    pub async fn listen<H: FeedHandler>(
        &mut self,
        transport: &mut C::Transport,
        handler: &mut H,
        stop: &CancellationToken,
        stats: &mut SessionStats,
    ) -> SessionOutcome {
        self.transition(ConnectionState::Listening);
        self.metrics.set_connected(true);
        handler.on_poll(PollReason::SessionStart).await;

        loop {
            if stop.is_cancelled() {
                return SessionOutcome::Stopped;
            }

            let frame = match timeout(self.settings.read_timeout, transport.recv()).await {
                Err(_) => {
                    debug!(
                        timeout_secs = self.settings.read_timeout.as_secs(),
                        "No message within read timeout, probing"
                    );
                    if let Err(e) = self.send_test(transport).await {
                        return e.into();
                    }
                    handler.on_poll(PollReason::Idle).await;
                    continue;
                }
                Ok(Err(e)) => return e.into(),
                Ok(Ok(None)) => return FeedError::Closed.into(),
                Ok(Ok(Some(frame))) => frame,
            };

            match protocol::classify(&frame) {
                Inbound::HeartbeatProbe => {
                    trace!("Answering heartbeat probe");
                    if let Err(e) = self.send_test(transport).await {
                        return e.into();
                    }
                }
                Inbound::Heartbeat => trace!("Heartbeat"),
                Inbound::Trades {
                    channel,
                    trades,
                    dropped,
                } => {
                    trace!(channel = %channel, count = trades.len(), dropped, "Trade notification");
                    for trade in trades {
                        stats.trades += 1;
                        handler.on_trade(trade).await;
                    }
                    if dropped > 0 {
                        debug!(dropped, "Dropped malformed or non-option trade records");
                        handler.on_dropped(dropped).await;
                    }
                }
                Inbound::Response { id, outcome } => match outcome {
                    Ok(_) => trace!(id, "Response"),
                    Err(e) => warn!(id, error = %e, "Request rejected"),
                },
                Inbound::Unrecognized => trace!("Ignoring unrecognized frame"),
            }

            handler.on_poll(PollReason::MessageProcessed).await;
        }
    }

    async fn send_test(&mut self, transport: &mut C::Transport) -> FeedResult<()> {
        let id = self.next_request_id();
        transport.send(protocol::test_request(id)?).await?;
        self.metrics.heartbeat_probe();
        Ok(())
    }

    /// Send a request and wait for the response carrying its id.
    ///
    /// Heartbeat probes are still answered while waiting; anything else that
    /// arrives before the response is dropped.
    async fn request(
        &mut self,
        transport: &mut C::Transport,
        id: u64,
        method: &str,
        text: String,
    ) -> FeedResult<Result<Value, RpcError>> {
        transport.send(text).await?;
        loop {
            let frame = match timeout(self.settings.read_timeout, transport.recv()).await {
                Err(_) => {
                    return Err(FeedError::NoResponse {
                        method: method.to_string(),
                        timeout_secs: self.settings.read_timeout.as_secs(),
                    })
                }
                Ok(Err(e)) => return Err(e),
                Ok(Ok(None)) => return Err(FeedError::Closed),
                Ok(Ok(Some(frame))) => frame,
            };

            match protocol::classify(&frame) {
                Inbound::Response { id: got, outcome } if got == id => return Ok(outcome),
                Inbound::HeartbeatProbe => self.send_test(transport).await?,
                other => debug!(method, frame = ?other, "Dropping frame while awaiting response"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ScriptedConnector, SessionScript};
    use assert_matches::assert_matches;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Recorder {
        trades: Arc<parking_lot::Mutex<Vec<Trade>>>,
        dropped: Arc<parking_lot::Mutex<usize>>,
        polls: Arc<parking_lot::Mutex<Vec<PollReason>>>,
    }

    #[async_trait]
    impl FeedHandler for Recorder {
        async fn on_trade(&mut self, trade: Trade) {
            self.trades.lock().push(trade);
        }

        async fn on_dropped(&mut self, count: usize) {
            *self.dropped.lock() += count;
        }

        async fn on_poll(&mut self, reason: PollReason) {
            self.polls.lock().push(reason);
        }
    }

    fn settings() -> FeedSettings {
        FeedSettings {
            url: "wss://scripted.invalid/ws/api/v2".to_string(),
            asset: "BTC".to_string(),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            heartbeat_interval_secs: 30,
            read_timeout: Duration::from_secs(45),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    fn client(connector: ScriptedConnector, settings: FeedSettings) -> FeedClient<ScriptedConnector> {
        FeedClient::new(connector, settings, FeedMetrics::new("BTC"))
    }

    fn trade_frame(records: &str) -> String {
        format!(
            r#"{{"jsonrpc":"2.0","method":"subscription","params":{{"channel":"trades.option.BTC.raw","data":[{}]}}}}"#,
            records
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_fixed_delay_when_server_closes() {
        let connector = ScriptedConnector::new(vec![
            SessionScript::closing(vec![]),
            SessionScript::silent(vec![]),
        ]);
        let probe = connector.clone();
        let stop = CancellationToken::new();

        let task = {
            let stop = stop.clone();
            let mut client = client(connector, settings());
            tokio::spawn(async move {
                let mut handler = Recorder::default();
                let result = client.run_forever(&mut handler, stop).await;
                (result, client.state())
            })
        };

        tokio::time::sleep(Duration::from_secs(6)).await;
        let times = probe.connect_times();
        assert_eq!(times.len(), 2);
        assert!(times[1] - times[0] >= Duration::from_secs(5));

        stop.cancel();
        let (result, state) = task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(state, ConnectionState::Stopped);
        assert_eq!(
            probe.sent_methods()[..3],
            ["public/auth", "public/set_heartbeat", "public/subscribe"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_rejection_is_recoverable() {
        let connector = ScriptedConnector::new(vec![
            SessionScript::rejecting_auth(),
            SessionScript::silent(vec![]),
        ]);
        let probe = connector.clone();
        let stop = CancellationToken::new();

        let task = {
            let stop = stop.clone();
            let mut client = client(connector, settings());
            tokio::spawn(async move {
                let mut handler = Recorder::default();
                client.run_forever(&mut handler, stop).await
            })
        };

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(probe.connect_count(), 2);
        stop.cancel();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_missing_credentials_fails_the_attempt() {
        let connector = ScriptedConnector::new(vec![SessionScript::silent(vec![])]);
        let mut settings = settings();
        settings.client_secret = None;
        let mut client = client(connector, settings);

        let err = client.connect_and_authenticate().await.err().unwrap();
        assert_matches!(err, FeedError::MissingCredentials);
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal() {
        let connector = ScriptedConnector::new(vec![SessionScript::silent(vec![])]);
        let probe = connector.clone();
        let mut settings = settings();
        settings.url = "not a url".to_string();
        let mut client = client(connector, settings);

        let result = client
            .run_forever(&mut Recorder::default(), CancellationToken::new())
            .await;
        assert_matches!(result, Err(FeedError::InvalidUrl { .. }));
        assert_eq!(client.state(), ConnectionState::Stopped);
        assert_eq!(probe.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_rejection_ends_session() {
        let mut script = SessionScript::silent(vec![]);
        script.reject_subscribe = true;
        let connector = ScriptedConnector::new(vec![script]);
        let mut client = client(connector, settings());

        let mut transport = client.connect_and_authenticate().await.unwrap();
        let err = client.subscribe(&mut transport).await.err().unwrap();
        assert_matches!(err, FeedError::SubscribeRejected(_));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwards_trades_and_answers_heartbeat() {
        let frames = vec![
            r#"{"jsonrpc":"2.0","method":"heartbeat","params":{"type":"test_request"}}"#.to_string(),
            trade_frame(
                r#"{"instrument_name":"BTC-27DEC24-90000-C","amount":146.0,"direction":"sell","price":0.02,"iv":34.0},
                   {"instrument_name":"BTC-PERPETUAL","amount":1.0,"direction":"buy","price":87800.0},
                   {"instrument_name":"BTC-27DEC24-85000-P","amount":3.0,"direction":"buy","price":0.01}"#,
            ),
        ];
        let connector = ScriptedConnector::new(vec![SessionScript::closing(frames)]);
        let probe = connector.clone();
        let mut client = client(connector, settings());
        let recorder = Recorder::default();
        let mut handler = recorder.clone();

        let outcome = {
            let mut transport = client.connect_and_authenticate().await.unwrap();
            client.subscribe(&mut transport).await.unwrap();
            let mut stats = SessionStats::new();
            let stop = CancellationToken::new();
            let outcome = client
                .listen(&mut transport, &mut handler, &stop, &mut stats)
                .await;
            assert_eq!(stats.trades, 2);
            outcome
        };

        assert_matches!(outcome, SessionOutcome::Recoverable(FeedError::Closed));
        let trades = recorder.trades.lock();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].dealer_delta(), 146.0);
        assert_eq!(trades[1].dealer_delta(), -3.0);
        assert_eq!(*recorder.dropped.lock(), 1);
        assert_eq!(recorder.polls.lock()[0], PollReason::SessionStart);
        assert!(probe.sent_methods().contains(&"public/test".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_sends_probe_and_keeps_listening() {
        let connector = ScriptedConnector::new(vec![SessionScript::silent(vec![])]);
        let probe = connector.clone();
        let stop = CancellationToken::new();
        let recorder = Recorder::default();

        let task = {
            let stop = stop.clone();
            let mut handler = recorder.clone();
            let mut client = client(connector, settings());
            tokio::spawn(async move { client.run_forever(&mut handler, stop).await })
        };

        tokio::time::sleep(Duration::from_secs(100)).await;
        stop.cancel();
        assert!(task.await.unwrap().is_ok());

        assert_eq!(probe.connect_count(), 1);
        let probes = probe
            .sent_methods()
            .iter()
            .filter(|m| m.as_str() == "public/test")
            .count();
        assert!(probes >= 2);
        assert!(recorder.polls.lock().contains(&PollReason::Idle));
    }

    #[test]
    fn test_session_outcome_from_error() {
        assert_matches!(
            SessionOutcome::from(FeedError::Closed),
            SessionOutcome::Recoverable(FeedError::Closed)
        );
        assert_matches!(
            SessionOutcome::from(FeedError::InvalidUrl {
                url: String::new(),
                message: String::new()
            }),
            SessionOutcome::Fatal(_)
        );
    }
}
