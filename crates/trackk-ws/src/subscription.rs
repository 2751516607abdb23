//! Subscription registry for live-data keys.
//!
//! Symbol subscriptions form an insertion-ordered set: a key is sent on the
//! wire only when it enters or leaves the set, and the whole set is replayed
//! in insertion order each time a transport is attached. There is no
//! per-consumer counting, so one `unsubscribe` removes the key for everyone.
//!
//! Collection (watchlist) interest is a separate channel that is forwarded
//! as-is, without dedup and without replay.

use crate::message::ClientRequest;
use indexmap::IndexSet;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use trackk_telemetry::Metrics;

/// Outbound frame queue of one transport session.
pub(crate) type FrameSink = mpsc::UnboundedSender<ClientRequest>;

struct Attachment {
    session: u64,
    sink: FrameSink,
}

#[derive(Default)]
struct Inner {
    symbols: IndexSet<String>,
    attachment: Option<Attachment>,
}

impl Inner {
    /// Queue a frame on the attached session. Returns false when detached.
    fn send(&mut self, request: ClientRequest) -> bool {
        let Some(attachment) = &self.attachment else {
            return false;
        };
        let op = request.op();
        if attachment.sink.send(request).is_err() {
            warn!(session = attachment.session, op, "Session sink closed, detaching");
            self.attachment = None;
            return false;
        }
        Metrics::ws_op_sent(op);
        true
    }
}

/// Registry of active subscriptions, owned by one connection manager.
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<Inner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `symbol` to the active set.
    ///
    /// Sends a `subscribe` op only if the symbol was absent. While no
    /// transport is attached the set is still updated and the op goes out
    /// with the next replay. Returns whether the symbol was newly added.
    pub fn subscribe(&self, symbol: &str) -> bool {
        let mut inner = self.inner.lock();
        if !inner.symbols.insert(symbol.to_string()) {
            debug!(symbol, "Already subscribed");
            return false;
        }
        let sent = inner.send(ClientRequest::subscribe(symbol));
        Metrics::subscriptions_active(inner.symbols.len());
        debug!(symbol, sent, "Subscribed");
        true
    }

    /// Remove `symbol` from the active set.
    ///
    /// Sends an `unsubscribe` op only if the symbol was present; unknown
    /// symbols are ignored silently. Returns whether the symbol was removed.
    pub fn unsubscribe(&self, symbol: &str) -> bool {
        let mut inner = self.inner.lock();
        if !inner.symbols.shift_remove(symbol) {
            return false;
        }
        let sent = inner.send(ClientRequest::unsubscribe(symbol));
        Metrics::subscriptions_active(inner.symbols.len());
        debug!(symbol, sent, "Unsubscribed");
        true
    }

    /// Express interest in a collection. Always forwarded, never replayed.
    ///
    /// Returns whether the op was queued on a live transport.
    pub fn subscribe_to_collection(&self, watchlist_id: &str) -> bool {
        let sent = self
            .inner
            .lock()
            .send(ClientRequest::subscribe_watchlist(watchlist_id));
        if !sent {
            debug!(watchlist_id, "Not connected, collection subscribe dropped");
        }
        sent
    }

    /// Withdraw interest in a collection. Always forwarded, never replayed.
    pub fn unsubscribe_from_collection(&self, watchlist_id: &str) -> bool {
        let sent = self
            .inner
            .lock()
            .send(ClientRequest::unsubscribe_watchlist(watchlist_id));
        if !sent {
            debug!(watchlist_id, "Not connected, collection unsubscribe dropped");
        }
        sent
    }

    /// Active symbols in insertion order.
    pub fn active_symbols(&self) -> Vec<String> {
        self.inner.lock().symbols.iter().cloned().collect()
    }

    pub fn is_subscribed(&self, symbol: &str) -> bool {
        self.inner.lock().symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().symbols.is_empty()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().attachment.is_some()
    }

    /// Forget every symbol without sending anything.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.symbols.clear();
        Metrics::subscriptions_active(0);
    }

    /// Attach a freshly opened session and replay the active set into it.
    ///
    /// Replay and attach happen under one lock, so a concurrent `subscribe`
    /// lands either in the replay or after it, never in both.
    pub(crate) fn attach(&self, session: u64, sink: FrameSink) -> usize {
        let mut inner = self.inner.lock();
        inner.attachment = Some(Attachment { session, sink });

        let symbols: Vec<String> = inner.symbols.iter().cloned().collect();
        let mut replayed = 0;
        for symbol in symbols {
            if inner.send(ClientRequest::subscribe(symbol)) {
                replayed += 1;
            }
        }
        info!(session, replayed, "Subscriptions replayed");
        replayed
    }

    /// Detach `session` if it is still the attached one.
    pub(crate) fn detach(&self, session: u64) -> bool {
        let mut inner = self.inner.lock();
        let is_current = inner
            .attachment
            .as_ref()
            .is_some_and(|a| a.session == session);
        if is_current {
            inner.attachment = None;
            debug!(session, "Session detached");
        }
        is_current
    }

    /// Detach whichever session is attached.
    pub(crate) fn detach_all(&self) {
        self.inner.lock().attachment = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ClientRequest>) -> Vec<ClientRequest> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn attached() -> (SubscriptionRegistry, mpsc::UnboundedReceiver<ClientRequest>) {
        let registry = SubscriptionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.attach(1, tx);
        (registry, rx)
    }

    #[test]
    fn test_subscribe_twice_sends_once() {
        let (registry, mut rx) = attached();

        assert!(registry.subscribe("NIFTY"));
        assert!(!registry.subscribe("NIFTY"));

        assert_eq!(drain(&mut rx), vec![ClientRequest::subscribe("NIFTY")]);
        assert_eq!(registry.active_symbols(), vec!["NIFTY"]);
    }

    #[test]
    fn test_unsubscribe_unknown_is_silent() {
        let (registry, mut rx) = attached();

        assert!(!registry.unsubscribe("NIFTY"));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_unsubscribe_active_sends_once_and_removes() {
        let (registry, mut rx) = attached();
        registry.subscribe("NIFTY");
        drain(&mut rx);

        assert!(registry.unsubscribe("NIFTY"));
        assert!(!registry.unsubscribe("NIFTY"));

        assert_eq!(drain(&mut rx), vec![ClientRequest::unsubscribe("NIFTY")]);
        assert!(!registry.is_subscribed("NIFTY"));
    }

    #[test]
    fn test_replay_in_insertion_order() {
        let registry = SubscriptionRegistry::new();
        for symbol in ["RELIANCE", "TCS", "INFY", "HDFC"] {
            registry.subscribe(symbol);
        }
        registry.unsubscribe("TCS");
        // Re-adding moves it to the end.
        registry.subscribe("TCS");

        let (tx, mut rx) = mpsc::unbounded_channel();
        assert_eq!(registry.attach(7, tx), 4);

        assert_eq!(
            drain(&mut rx),
            ["RELIANCE", "INFY", "HDFC", "TCS"]
                .into_iter()
                .map(ClientRequest::subscribe)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_detached_ops_update_set_without_sending() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.subscribe("NIFTY"));
        assert!(!registry.subscribe_to_collection("wl-1"));
        assert!(registry.is_subscribed("NIFTY"));
        assert!(!registry.is_attached());
    }

    #[test]
    fn test_collection_ops_are_not_deduplicated_or_replayed() {
        let (registry, mut rx) = attached();
        registry.subscribe_to_collection("wl-1");
        registry.subscribe_to_collection("wl-1");
        registry.unsubscribe_from_collection("wl-1");

        assert_eq!(
            drain(&mut rx),
            vec![
                ClientRequest::subscribe_watchlist("wl-1"),
                ClientRequest::subscribe_watchlist("wl-1"),
                ClientRequest::unsubscribe_watchlist("wl-1"),
            ]
        );

        let (tx, mut rx2) = mpsc::unbounded_channel();
        registry.attach(2, tx);
        assert!(drain(&mut rx2).is_empty());
    }

    #[test]
    fn test_stale_session_cannot_detach_newer_one() {
        let (registry, _rx) = attached();
        let (tx, _rx2) = mpsc::unbounded_channel();
        registry.attach(2, tx);

        assert!(!registry.detach(1));
        assert!(registry.is_attached());
        assert!(registry.detach(2));
        assert!(!registry.is_attached());
    }

    #[test]
    fn test_closed_sink_detaches() {
        let (registry, rx) = attached();
        drop(rx);

        assert!(registry.subscribe("NIFTY"));
        assert!(!registry.is_attached());
        assert!(registry.is_subscribed("NIFTY"));
    }
}
