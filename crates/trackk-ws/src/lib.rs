//! Live-data WebSocket client for the Trackk dashboard.
//!
//! Provides:
//! - Tagged-union wire codec for inbound feed messages and outbound ops
//! - Connection lifecycle with exponential-backoff reconnection
//! - Deduplicated symbol subscriptions, replayed after every reconnect
//! - Listener fan-out with per-listener failure isolation

pub mod backoff;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod router;
pub mod subscription;

pub use backoff::Backoff;
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState};
pub use error::{WsError, WsResult};
pub use message::{
    decode_frame, ClientRequest, InboundMessage, NewsAlert, OrderUpdate, PresenceAction,
    PresenceUpdate, PriceUpdate, ScoreUpdate, WatchlistUpdate,
};
pub use router::{DispatchReport, ListenerHandle, ListenerResult, MessageListener, MessageRouter};
pub use subscription::SubscriptionRegistry;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any `wss://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
