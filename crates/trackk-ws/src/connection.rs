//! WebSocket connection manager.
//!
//! Owns the single transport of one client: connection lifecycle, automatic
//! reconnection with exponential backoff, heartbeat, and replay of the
//! subscription registry into every freshly opened session.
//!
//! One supervisor task runs per lifecycle (from `connect()` to `disconnect()`
//! or exhaustion). The task runs the session loop, and on an unexpected close
//! drives the backoff schedule until a new session opens or attempts run out.

use crate::backoff::Backoff;
use crate::error::{WsError, WsResult};
use crate::heartbeat::Heartbeat;
use crate::message::ClientRequest;
use crate::router::MessageRouter;
use crate::subscription::{FrameSink, SubscriptionRegistry};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::http::uri::{PathAndQuery, Uri};
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use trackk_telemetry::Metrics;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// WebSocket URL, without the token.
    pub url: String,
    /// Reconnect attempts after an unexpected close before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Quiet period before a ping is sent (0 = no heartbeat).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Some frame must arrive within this long after a ping.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Handshake deadline for a single connection attempt.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// URL to dial, with `token` appended as a percent-encoded query param.
    ///
    /// A URL without a path gets `/` so the request target stays valid.
    pub fn endpoint(&self, token: Option<&str>) -> WsResult<String> {
        let uri: Uri = self
            .url
            .parse()
            .map_err(|e| WsError::InvalidUrl(format!("{}: {e}", self.url)))?;
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(self.url.clone());
        };

        let path = match uri.path() {
            "" => "/",
            path => path,
        };
        let token = urlencoding::encode(token);
        let path_and_query = match uri.query().filter(|q| !q.is_empty()) {
            Some(query) => format!("{path}?{query}&token={token}"),
            None => format!("{path}?token={token}"),
        };

        let mut parts = uri.into_parts();
        parts.path_and_query = Some(
            path_and_query
                .parse::<PathAndQuery>()
                .map_err(|e| WsError::InvalidUrl(e.to_string()))?,
        );
        let uri = Uri::from_parts(parts).map_err(|e| WsError::InvalidUrl(e.to_string()))?;
        Ok(uri.to_string())
    }

    fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_base_delay_ms),
            self.max_reconnect_attempts,
        )
    }

    fn heartbeat(&self) -> Heartbeat {
        Heartbeat::new(
            Duration::from_millis(self.heartbeat_interval_ms),
            Duration::from_millis(self.heartbeat_timeout_ms),
        )
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transport that completed its handshake and is attached to the registry.
struct Session {
    id: u64,
    stream: WsStream,
    outbound_rx: mpsc::UnboundedReceiver<ClientRequest>,
}

/// Why a session loop returned.
enum SessionEnd {
    /// `disconnect()` was called.
    Cancelled,
    /// The transport went away on its own.
    Dropped(WsError),
}

struct Shared {
    config: ConnectionConfig,
    state: watch::Sender<ConnectionState>,
    backoff: Mutex<Backoff>,
    registry: Arc<SubscriptionRegistry>,
    router: MessageRouter,
    endpoint: Mutex<String>,
    /// Token of the current lifecycle. State transitions made on behalf of a
    /// lifecycle happen under this lock and are skipped once it is cancelled.
    lifecycle: Mutex<CancellationToken>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    session_seq: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
        Metrics::ws_state_set(state.as_str());
    }

    /// Set `state` unless `lifecycle` has been cancelled.
    fn publish_state(&self, state: ConnectionState, lifecycle: &CancellationToken) -> bool {
        let _current = self.lifecycle.lock();
        if lifecycle.is_cancelled() {
            return false;
        }
        self.set_state(state);
        true
    }

    /// Attach a new session, replay subscriptions, then go Open.
    fn activate(&self, session: u64, sink: FrameSink, lifecycle: &CancellationToken) -> bool {
        let _current = self.lifecycle.lock();
        if lifecycle.is_cancelled() {
            return false;
        }
        let replayed = self.registry.attach(session, sink);
        self.backoff.lock().reset();
        self.set_state(ConnectionState::Open);
        info!(session, replayed, "WebSocket connected");
        true
    }
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(
        config: ConnectionConfig,
        registry: Arc<SubscriptionRegistry>,
        router: MessageRouter,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let lifecycle = CancellationToken::new();
        lifecycle.cancel();

        Self {
            shared: Arc::new(Shared {
                backoff: Mutex::new(config.backoff()),
                config,
                state,
                registry,
                router,
                endpoint: Mutex::new(String::new()),
                lifecycle: Mutex::new(lifecycle),
                supervisor: Mutex::new(None),
                session_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Open the connection.
    ///
    /// Resolves once a session is open. If a connection is already open or
    /// its first handshake is in flight this returns `Ok(())` immediately and
    /// no second transport is created. During a pending reconnect it waits
    /// for that reconnect to open (or to be abandoned).
    ///
    /// A failed first handshake is returned to the caller; the backoff
    /// schedule still runs in the background, as after any unexpected close.
    pub async fn connect(&self, token: Option<&str>) -> WsResult<()> {
        loop {
            let claimed = self.shared.state.send_if_modified(|state| {
                if *state == ConnectionState::Disconnected {
                    *state = ConnectionState::Connecting;
                    true
                } else {
                    false
                }
            });
            if claimed {
                break;
            }
            match self.state() {
                // Lost a race with disconnect() or exhaustion; claim again.
                ConnectionState::Disconnected => continue,
                ConnectionState::Reconnecting => {
                    debug!("connect() waiting for pending reconnect");
                    return self.wait_for_open().await;
                }
                state @ (ConnectionState::Open | ConnectionState::Connecting) => {
                    debug!(%state, "connect() ignored, connection already active");
                    return Ok(());
                }
            }
        }
        Metrics::ws_state_set(ConnectionState::Connecting.as_str());

        let lifecycle = CancellationToken::new();
        *self.shared.lifecycle.lock() = lifecycle.clone();

        let endpoint = match self.shared.config.endpoint(token) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!(error = %e, "WebSocket endpoint rejected");
                self.shared
                    .publish_state(ConnectionState::Disconnected, &lifecycle);
                lifecycle.cancel();
                return Err(e);
            }
        };
        *self.shared.endpoint.lock() = endpoint;

        let (first, result) = match open_session(&self.shared, &lifecycle).await {
            Ok(session) => (Some(session), Ok(())),
            Err(e) if lifecycle.is_cancelled() => return Err(e),
            Err(e) => {
                error!(error = %e, url = %self.shared.config.url, "WebSocket connect failed");
                self.shared
                    .publish_state(ConnectionState::Reconnecting, &lifecycle);
                (None, Err(e))
            }
        };
        let handle = tokio::spawn(supervise(self.shared.clone(), first, lifecycle));
        *self.shared.supervisor.lock() = Some(handle);
        result
    }

    /// Wait for the current reconnect cycle to end.
    async fn wait_for_open(&self) -> WsResult<()> {
        let mut states = self.shared.state.subscribe();
        loop {
            match *states.borrow_and_update() {
                ConnectionState::Open => return Ok(()),
                ConnectionState::Disconnected => {
                    return Err(WsError::ConnectionFailed(
                        "reconnect abandoned before the connection opened".to_string(),
                    ));
                }
                ConnectionState::Connecting | ConnectionState::Reconnecting => {}
            }
            if states.changed().await.is_err() {
                return Err(WsError::ConnectionFailed(
                    "connection manager dropped".to_string(),
                ));
            }
        }
    }

    /// Close the connection and forget every symbol subscription.
    ///
    /// Cancels a pending reconnect timer, asks the session task to send a
    /// Close frame, and sets Disconnected. Safe to call in any state.
    pub fn disconnect(&self) {
        {
            let lifecycle = self.shared.lifecycle.lock();
            lifecycle.cancel();
            self.shared.registry.detach_all();
            self.shared.registry.clear();
            self.shared.backoff.lock().reset();
            self.shared.set_state(ConnectionState::Disconnected);
        }
        info!("WebSocket disconnected");
    }

    /// Disconnect and wait for the session task to flush its Close frame.
    pub async fn shutdown(&self) {
        info!("ConnectionManager shutdown requested");
        self.disconnect();
        let handle = self.shared.supervisor.lock().take();
        if let Some(handle) = handle {
            let grace = Duration::from_millis(self.shared.config.connect_timeout_ms.max(1));
            if tokio::time::timeout(grace, handle).await.is_err() {
                warn!("Session task did not finish within shutdown grace period");
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Reconnect attempts consumed since the last successful open.
    pub fn reconnect_attempt(&self) -> u32 {
        self.shared.backoff.lock().attempt()
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.shared.registry
    }

    pub fn router(&self) -> &MessageRouter {
        &self.shared.router
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shared.lifecycle.lock().cancel();
    }
}

/// Dial the stored endpoint and attach the resulting session.
async fn open_session(shared: &Shared, lifecycle: &CancellationToken) -> WsResult<Session> {
    let endpoint = shared.endpoint.lock().clone();
    info!(url = %shared.config.url, "Connecting to WebSocket");

    let deadline = Duration::from_millis(shared.config.connect_timeout_ms);
    let handshake = connect_async_tls_with_config(endpoint.as_str(), None, true, None);

    let stream = tokio::select! {
        () = lifecycle.cancelled() => {
            return Err(WsError::ConnectionFailed("connect cancelled".to_string()));
        }
        result = tokio::time::timeout(deadline, handshake) => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(WsError::ConnectionFailed(format!(
                    "handshake timed out after {}ms",
                    deadline.as_millis()
                )));
            }
        },
    };

    let id = shared.session_seq.fetch_add(1, Ordering::Relaxed) + 1;
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    if !shared.activate(id, outbound_tx, lifecycle) {
        return Err(WsError::ConnectionFailed(
            "disconnected during handshake".to_string(),
        ));
    }

    Ok(Session {
        id,
        stream,
        outbound_rx,
    })
}

/// Run sessions until the lifecycle is cancelled or reconnects run out.
///
/// Starts in the backoff loop when the first handshake failed.
async fn supervise(shared: Arc<Shared>, first: Option<Session>, lifecycle: CancellationToken) {
    let mut next = first;
    loop {
        let session = match next.take() {
            Some(session) => session,
            None => match reconnect(&shared, &lifecycle).await {
                Some(session) => session,
                None => return,
            },
        };

        let id = session.id;
        let end = run_session(&shared, session, &lifecycle).await;
        shared.registry.detach(id);

        match end {
            SessionEnd::Cancelled => {
                debug!(session = id, "Session ended by disconnect");
                return;
            }
            SessionEnd::Dropped(reason) => {
                warn!(session = id, %reason, "WebSocket connection lost");
            }
        }
    }
}

/// Backoff loop. Returns the next open session, or `None` when cancelled or
/// exhausted.
async fn reconnect(shared: &Shared, lifecycle: &CancellationToken) -> Option<Session> {
    loop {
        let (delay, attempt) = {
            let mut backoff = shared.backoff.lock();
            (backoff.next_delay(), backoff.attempt())
        };

        let Some(delay) = delay else {
            error!(
                attempts = shared.config.max_reconnect_attempts,
                "Max reconnection attempts reached, giving up"
            );
            Metrics::ws_reconnect("exhausted");
            shared.publish_state(ConnectionState::Disconnected, lifecycle);
            return None;
        };

        if !shared.publish_state(ConnectionState::Reconnecting, lifecycle) {
            return None;
        }
        warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
        Metrics::ws_reconnect("scheduled");

        tokio::select! {
            () = lifecycle.cancelled() => {
                info!(attempt, "Pending reconnect cancelled");
                return None;
            }
            () = tokio::time::sleep(delay) => {}
        }

        match open_session(shared, lifecycle).await {
            Ok(session) => {
                Metrics::ws_reconnect("succeeded");
                return Some(session);
            }
            Err(_) if lifecycle.is_cancelled() => return None,
            Err(e) => {
                warn!(attempt, error = %e, "Reconnect attempt failed");
                Metrics::ws_reconnect("failed");
            }
        }
    }
}

/// Pump one session: inbound frames to the router, queued ops to the socket,
/// heartbeat checks on a ticker.
async fn run_session(
    shared: &Shared,
    session: Session,
    lifecycle: &CancellationToken,
) -> SessionEnd {
    let Session {
        id,
        stream,
        mut outbound_rx,
    } = session;
    let (mut write, mut read) = stream.split();

    let mut heartbeat = shared.config.heartbeat();
    let mut ticker = tokio::time::interval(heartbeat.check_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            () = lifecycle.cancelled() => {
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!(session = id, error = %e, "Failed to send Close frame");
                }
                return SessionEnd::Cancelled;
            }

            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    heartbeat.record_frame();
                    shared.router.dispatch_frame(&text);
                }
                Some(Ok(Message::Ping(data))) => {
                    heartbeat.record_frame();
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        return SessionEnd::Dropped(e.into());
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (f.code.into(), f.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    return SessionEnd::Dropped(WsError::ConnectionClosed { code, reason });
                }
                Some(Ok(_)) => heartbeat.record_frame(),
                Some(Err(e)) => return SessionEnd::Dropped(e.into()),
                None => {
                    return SessionEnd::Dropped(WsError::ConnectionClosed {
                        code: 1006,
                        reason: "stream ended".to_string(),
                    });
                }
            },

            Some(request) = outbound_rx.recv() => {
                let text = match request.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(session = id, op = request.op(), error = %e, "Failed to encode op");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text)).await {
                    return SessionEnd::Dropped(e.into());
                }
            }

            _ = ticker.tick() => {
                let now = Instant::now();
                if heartbeat.is_timed_out(now) {
                    return SessionEnd::Dropped(WsError::HeartbeatTimeout);
                }
                if heartbeat.should_ping(now) {
                    if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                        return SessionEnd::Dropped(e.into());
                    }
                    heartbeat.record_ping(now);
                    debug!(session = id, "Heartbeat ping sent");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_encoded_token() {
        let config = ConnectionConfig::new("wss://feed.trackk.in/ws");
        assert_eq!(config.endpoint(None).unwrap(), "wss://feed.trackk.in/ws");
        assert_eq!(config.endpoint(Some("")).unwrap(), "wss://feed.trackk.in/ws");
        assert_eq!(
            config.endpoint(Some("a b/c=")).unwrap(),
            "wss://feed.trackk.in/ws?token=a%20b%2Fc%3D"
        );

        let with_query = ConnectionConfig::new("ws://localhost:8080/ws?v=2");
        assert_eq!(
            with_query.endpoint(Some("t")).unwrap(),
            "ws://localhost:8080/ws?v=2&token=t"
        );
    }

    #[test]
    fn test_endpoint_without_path_gets_root() {
        let config = ConnectionConfig::new("ws://127.0.0.1:1234");
        assert_eq!(
            config.endpoint(Some("t0k")).unwrap(),
            "ws://127.0.0.1:1234/?token=t0k"
        );

        let host_only = ConnectionConfig::new("wss://ws.trackk.in");
        assert_eq!(
            host_only.endpoint(Some("abc")).unwrap(),
            "wss://ws.trackk.in/?token=abc"
        );
    }

    #[test]
    fn test_endpoint_rejects_garbage_url() {
        let config = ConnectionConfig::new("not a url");
        assert!(matches!(
            config.endpoint(Some("t")),
            Err(WsError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_config_fills_defaults() {
        let config: ConnectionConfig = serde_json::from_str(r#"{"url":"ws://x"}"#).unwrap();
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_base_delay_ms, 1000);
        assert_eq!(config, ConnectionConfig::new("ws://x"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
        assert_eq!(ConnectionState::Open.as_str(), "open");
    }

    #[tokio::test]
    async fn test_new_manager_is_disconnected() {
        let manager = ConnectionManager::new(
            ConnectionConfig::new("ws://127.0.0.1:9"),
            Arc::new(SubscriptionRegistry::new()),
            MessageRouter::new(),
        );
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(!manager.is_connected());
        assert_eq!(manager.reconnect_attempt(), 0);

        // No-op when nothing is connected.
        manager.disconnect();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }
}
