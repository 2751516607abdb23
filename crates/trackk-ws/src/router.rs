//! Fan-out of decoded inbound messages to registered listeners.
//!
//! Listeners run synchronously, in registration order, on the task that
//! decoded the frame. A listener that returns an error or panics is logged
//! and skipped; the remaining listeners still receive the message.

use crate::message::{decode_frame, InboundMessage};
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{error, trace, warn};
use trackk_telemetry::Metrics;

/// Result returned by a listener.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Receiver of routed inbound messages.
pub trait MessageListener: Send + Sync + 'static {
    fn on_message(&self, message: &InboundMessage) -> ListenerResult;
}

impl<F> MessageListener for F
where
    F: Fn(&InboundMessage) -> ListenerResult + Send + Sync + 'static,
{
    fn on_message(&self, message: &InboundMessage) -> ListenerResult {
        self(message)
    }
}

type SharedListener = Arc<dyn MessageListener>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, SharedListener)>,
}

impl Listeners {
    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Message router. Cheap to clone; clones share the listener list.
#[derive(Clone, Default)]
pub struct MessageRouter {
    listeners: Arc<RwLock<Listeners>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure listener.
    pub fn on_message<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&InboundMessage) -> ListenerResult + Send + Sync + 'static,
    {
        self.add_listener(Arc::new(listener))
    }

    /// Register a shared listener object.
    pub fn add_listener(&self, listener: Arc<dyn MessageListener>) -> ListenerHandle {
        let mut listeners = self.listeners.write();
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, listener));
        trace!(listener_id = id, "Listener registered");

        ListenerHandle {
            id,
            listeners: Arc::downgrade(&self.listeners),
            active: true,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().entries.len()
    }

    /// Deliver `message` to every listener registered at call time.
    pub fn dispatch(&self, message: &InboundMessage) -> DispatchReport {
        // Snapshot so listeners may (un)register without deadlocking.
        let snapshot: Vec<(u64, SharedListener)> = self.listeners.read().entries.clone();
        let kind = message.kind();
        let mut report = DispatchReport::default();

        for (listener_id, listener) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener.on_message(message))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(listener_id, kind, error = %e, "Message listener failed");
                    Metrics::listener_failure();
                    report.failed += 1;
                }
                Err(payload) => {
                    error!(
                        listener_id,
                        kind,
                        panic = panic_message(payload.as_ref()),
                        "Message listener panicked"
                    );
                    Metrics::listener_failure();
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Decode a text frame and dispatch it.
    ///
    /// A frame that fails to decode is logged and dropped; nothing is
    /// dispatched and `None` is returned.
    pub fn dispatch_frame(&self, text: &str) -> Option<DispatchReport> {
        match decode_frame(text) {
            Ok(message) => {
                Metrics::ws_frame(message.kind());
                Some(self.dispatch(&message))
            }
            Err(e) => {
                warn!(error = %e, frame_len = text.len(), "Dropping undecodable frame");
                Metrics::ws_decode_error();
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

/// Registration of one listener.
///
/// Dropping the handle (or calling [`ListenerHandle::unsubscribe`]) removes
/// the listener. [`ListenerHandle::forget`] keeps it registered for the
/// router's lifetime.
#[must_use = "dropping the handle unregisters the listener"]
pub struct ListenerHandle {
    id: u64,
    listeners: Weak<RwLock<Listeners>>,
    active: bool,
}

impl ListenerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the listener registered without holding the handle.
    pub fn forget(mut self) {
        self.active = false;
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(listeners) = self.listeners.upgrade() {
            if listeners.write().remove(self.id) {
                trace!(listener_id = self.id, "Listener unregistered");
            }
        }
    }
}
