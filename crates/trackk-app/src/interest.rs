//! Keeps live-data subscriptions in step with the widgets on the dashboard.
//!
//! Symbols go through the registry's deduplicated set, so they survive
//! reconnects on their own. Collection interest is ref-counted here by the
//! number of widgets that declare it; the wire only sees the 0→1 and 1→0
//! edges. Collection ops are not replayed by the registry, so they are
//! re-issued through [`InterestReconciler::resubscribe_collections`] each
//! time a session opens.

use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use tracing::debug;
use trackk_core::Widget;
use trackk_ws::SubscriptionRegistry;

/// Wire-level changes made by one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestDiff {
    pub subscribed: Vec<String>,
    pub unsubscribed: Vec<String>,
    pub opened_collections: Vec<String>,
    pub closed_collections: Vec<String>,
}

impl InterestDiff {
    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty()
            && self.unsubscribed.is_empty()
            && self.opened_collections.is_empty()
            && self.closed_collections.is_empty()
    }
}

pub struct InterestReconciler {
    registry: Arc<SubscriptionRegistry>,
    /// Symbols this reconciler put into the registry.
    symbols: IndexSet<String>,
    /// Widgets declaring each collection.
    collections: IndexMap<String, usize>,
}

impl InterestReconciler {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            registry,
            symbols: IndexSet::new(),
            collections: IndexMap::new(),
        }
    }

    /// Bring subscriptions in line with `widgets`.
    pub fn reconcile(&mut self, widgets: &[Widget]) -> InterestDiff {
        let mut wanted_symbols = IndexSet::new();
        let mut wanted_collections: IndexMap<String, usize> = IndexMap::new();
        for deps in widgets.iter().map(Widget::dependencies) {
            wanted_symbols.extend(deps.symbols);
            // One widget counts once even if it lists a collection twice.
            let per_widget: IndexSet<String> = deps.collections.into_iter().collect();
            for collection in per_widget {
                *wanted_collections.entry(collection).or_default() += 1;
            }
        }

        let mut diff = InterestDiff::default();

        for symbol in self.symbols.difference(&wanted_symbols) {
            self.registry.unsubscribe(symbol);
            diff.unsubscribed.push(symbol.clone());
        }
        for symbol in wanted_symbols.difference(&self.symbols) {
            self.registry.subscribe(symbol);
            diff.subscribed.push(symbol.clone());
        }

        for collection in self.collections.keys() {
            if !wanted_collections.contains_key(collection) {
                self.registry.unsubscribe_from_collection(collection);
                diff.closed_collections.push(collection.clone());
            }
        }
        for collection in wanted_collections.keys() {
            if !self.collections.contains_key(collection) {
                self.registry.subscribe_to_collection(collection);
                diff.opened_collections.push(collection.clone());
            }
        }

        self.symbols = wanted_symbols;
        self.collections = wanted_collections;

        if !diff.is_empty() {
            debug!(
                subscribed = diff.subscribed.len(),
                unsubscribed = diff.unsubscribed.len(),
                opened = diff.opened_collections.len(),
                closed = diff.closed_collections.len(),
                "Interest reconciled"
            );
        }
        diff
    }

    /// Re-send collection interest on a freshly opened session.
    pub fn resubscribe_collections(&self) -> usize {
        self.collections
            .keys()
            .filter(|id| self.registry.subscribe_to_collection(id))
            .count()
    }

    /// Forget everything tracked, without touching the wire.
    ///
    /// Used after the connection manager has cleared the registry.
    pub fn reset(&mut self) {
        self.symbols.clear();
        self.collections.clear();
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    /// Number of widgets currently declaring `watchlist_id`.
    pub fn collection_refcount(&self, watchlist_id: &str) -> usize {
        self.collections.get(watchlist_id).copied().unwrap_or(0)
    }
}
