//! Connection lifecycle tests against a local mock feed server.

mod common;

use common::mock_ws::MockWsServer;
use common::wait_until;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use trackk_ws::{
    ClientRequest, ConnectionConfig, ConnectionManager, ConnectionState, InboundMessage,
    MessageRouter, SubscriptionRegistry,
};

const WAIT: Duration = Duration::from_secs(3);

fn manager(url: String, base_delay_ms: u64, max_attempts: u32) -> ConnectionManager {
    let config = ConnectionConfig {
        reconnect_base_delay_ms: base_delay_ms,
        max_reconnect_attempts: max_attempts,
        connect_timeout_ms: 2_000,
        ..ConnectionConfig::new(url)
    };
    ConnectionManager::new(
        config,
        Arc::new(SubscriptionRegistry::new()),
        MessageRouter::new(),
    )
}

fn subscribe_frame(symbol: &str) -> String {
    ClientRequest::subscribe(symbol).encode().unwrap()
}

async fn wait_for_state(manager: &ConnectionManager, state: ConnectionState) -> bool {
    wait_until(WAIT, || async { manager.state() == state }).await
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let server = MockWsServer::start().await;
    let manager = manager(server.url(), 20, 5);

    assert_ok!(manager.connect(Some("secret")).await);
    assert_eq!(manager.state(), ConnectionState::Open);
    assert!(manager.is_connected());

    // Second call while open must not dial again.
    assert_ok!(manager.connect(Some("secret")).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connection_count().await, 1);

    manager.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_subscribe_is_deduplicated_on_the_wire() {
    let server = MockWsServer::start().await;
    let manager = manager(server.url(), 20, 5);
    assert_ok!(manager.connect(None).await);

    let registry = manager.registry();
    assert!(registry.subscribe("NIFTY"));
    assert!(!registry.subscribe("NIFTY"));
    assert!(!registry.unsubscribe("TCS"));
    assert!(registry.unsubscribe("NIFTY"));

    let expected = vec![
        subscribe_frame("NIFTY"),
        ClientRequest::unsubscribe("NIFTY").encode().unwrap(),
    ];
    assert!(wait_until(WAIT, || async { server.received_messages().await.len() >= 2 }).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.received_messages().await, expected);

    manager.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_replay_after_drop_in_insertion_order() {
    let server = MockWsServer::start().await;
    let manager = manager(server.url(), 20, 5);

    // Subscribed while disconnected: replayed on the first open.
    for symbol in ["RELIANCE", "TCS", "INFY"] {
        manager.registry().subscribe(symbol);
    }
    assert_ok!(manager.connect(None).await);

    let expected: Vec<String> = ["RELIANCE", "TCS", "INFY"]
        .into_iter()
        .map(subscribe_frame)
        .collect();
    assert!(wait_until(WAIT, || async { server.received_on(1).await.len() == 3 }).await);
    assert_eq!(server.received_on(1).await, expected);

    let mut states = manager.state_changes();
    server.drop_connections();

    assert!(wait_until(WAIT, || async { server.received_on(2).await.len() == 3 }).await);
    assert_eq!(server.received_on(2).await, expected);
    assert!(wait_for_state(&manager, ConnectionState::Open).await);
    assert_eq!(manager.reconnect_attempt(), 0);

    // The drop was observable as a Reconnecting transition.
    assert!(states.has_changed().unwrap());

    manager.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_inbound_frames_are_routed_and_garbage_skipped() {
    let server = MockWsServer::start().await;
    let manager = manager(server.url(), 20, 5);

    let seen: Arc<Mutex<Vec<InboundMessage>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let _handle = manager.router().on_message(move |msg| {
        seen_clone.lock().push(msg.clone());
        Ok(())
    });

    assert_ok!(manager.connect(None).await);
    assert!(wait_until(WAIT, || async { server.connection_count().await == 1 }).await);

    server.push_text("definitely not json");
    server.push_text(r#"{"type":"unknown_kind","symbol":"X"}"#);
    server.push_text(
        r#"{"type":"price_update","symbol":"NIFTY","price":22450.5,"change":12.5,"changePercent":0.06}"#,
    );

    assert!(wait_until(WAIT, || async { !seen.lock().is_empty() }).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].kind(), "price_update");
    assert_eq!(seen[0].symbol(), Some("NIFTY"));
    drop(seen);

    // The session survived the bad frames.
    assert!(manager.is_connected());

    manager.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_cancels_pending_reconnect() {
    let server = MockWsServer::start().await;
    let manager = manager(server.url(), 400, 5);
    manager.registry().subscribe("NIFTY");
    assert_ok!(manager.connect(None).await);

    server.drop_connections();
    assert!(wait_for_state(&manager, ConnectionState::Reconnecting).await);

    manager.disconnect();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(manager.registry().is_empty());

    // Well past the first backoff delay: no new connection was made.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(server.connection_count().await, 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    server.shutdown().await;
}

#[tokio::test]
async fn test_handshake_failure_rejects_connect_then_retries() {
    // Reserve a port, then free it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let manager = manager(format!("ws://{addr}"), 50, 5);
    manager.registry().subscribe("NIFTY");
    assert_err!(manager.connect(Some("secret")).await);
    assert_eq!(manager.state(), ConnectionState::Reconnecting);

    // The feed comes up while the backoff schedule is running.
    let server = MockWsServer::start_on(addr).await;
    assert!(wait_for_state(&manager, ConnectionState::Open).await);
    assert_eq!(server.connection_count().await, 1);
    assert_eq!(manager.reconnect_attempt(), 0);

    assert!(wait_until(WAIT, || async { !server.received_on(1).await.is_empty() }).await);
    assert_eq!(server.received_on(1).await, vec![subscribe_frame("NIFTY")]);

    manager.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_connects_open_one_transport() {
    let server = MockWsServer::start().await;
    let manager = manager(server.url(), 20, 5);

    let (first, second) = tokio::join!(manager.connect(None), manager.connect(None));
    assert_ok!(first);
    assert_ok!(second);
    assert!(wait_for_state(&manager, ConnectionState::Open).await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connection_count().await, 1);

    manager.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_connect_during_reconnect_waits_for_open() {
    let server = MockWsServer::start().await;
    let manager = manager(server.url(), 300, 5);
    assert_ok!(manager.connect(None).await);

    server.drop_connections();
    assert!(wait_for_state(&manager, ConnectionState::Reconnecting).await);

    assert_ok!(manager.connect(None).await);
    assert!(manager.is_connected());
    assert_eq!(server.connection_count().await, 2);

    manager.shutdown().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_connect_during_reconnect_fails_on_exhaustion() {
    let server = MockWsServer::start().await;
    let manager = manager(server.url(), 100, 2);
    assert_ok!(manager.connect(None).await);

    server.shutdown().await;
    assert!(wait_for_state(&manager, ConnectionState::Reconnecting).await);

    assert_err!(manager.connect(None).await);
    assert!(!manager.is_connected());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_reconnect_exhaustion_ends_disconnected() {
    let server = MockWsServer::start().await;
    let manager = manager(server.url(), 5, 3);
    manager.registry().subscribe("NIFTY");
    assert_ok!(manager.connect(None).await);

    // Server goes away for good: every reconnect handshake fails.
    server.shutdown().await;

    assert!(wait_for_state(&manager, ConnectionState::Disconnected).await);
    assert_eq!(manager.reconnect_attempt(), 3);

    // Exhaustion is silent: the active set survives for a later connect().
    assert!(manager.registry().is_subscribed("NIFTY"));
}
