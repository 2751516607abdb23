//! Local watchlists, the active-list pointer, stock selection, and live
//! collaboration state for shared lists.

use chrono::Utc;
use indexmap::IndexSet;
use std::collections::HashMap;
use tracing::{debug, warn};
use trackk_core::{Stock, Watchlist};
use trackk_ws::{InboundMessage, PresenceAction};

#[derive(Debug, Clone, Default)]
pub struct WatchlistBook {
    watchlists: Vec<Watchlist>,
    active: Option<String>,
    selected: IndexSet<String>,
    /// Users currently viewing each shared watchlist.
    viewers: HashMap<String, IndexSet<String>>,
}

impl WatchlistBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty watchlist and make it active.
    pub fn create(&mut self, name: impl Into<String>) -> String {
        let watchlist = Watchlist::new(Watchlist::generate_id(), name);
        let id = watchlist.id.clone();
        self.watchlists.push(watchlist);
        self.active = Some(id.clone());
        id
    }

    /// Delete a watchlist; clears the active pointer if it pointed there.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.watchlists.len();
        self.watchlists.retain(|w| w.id != id);
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        self.viewers.remove(id);
        self.watchlists.len() != before
    }

    pub fn set_active(&mut self, id: impl Into<String>) {
        self.active = Some(id.into());
    }

    pub fn active(&self) -> Option<&Watchlist> {
        let id = self.active.as_deref()?;
        self.get(id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Watchlist> {
        self.watchlists.iter().find(|w| w.id == id)
    }

    pub fn watchlists(&self) -> &[Watchlist] {
        &self.watchlists
    }

    /// Append `stock` to watchlist `id`.
    pub fn add_stock(&mut self, id: &str, stock: Stock) -> bool {
        self.modify(id, |w| w.stocks.push(stock))
    }

    /// Remove every row for `symbol` from watchlist `id`.
    pub fn remove_stock(&mut self, id: &str, symbol: &str) -> bool {
        self.modify(id, |w| w.stocks.retain(|s| s.symbol != symbol))
    }

    /// Mark watchlist `id` as shared with exactly `user_ids`.
    pub fn share(&mut self, id: &str, user_ids: Vec<String>) -> bool {
        self.modify(id, |w| {
            w.is_shared = true;
            w.shared_with = user_ids;
        })
    }

    pub fn toggle_selection(&mut self, symbol: &str) {
        if !self.selected.shift_remove(symbol) {
            self.selected.insert(symbol.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Selected symbols in selection order.
    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    pub fn is_selected(&self, symbol: &str) -> bool {
        self.selected.contains(symbol)
    }

    /// Users currently viewing watchlist `id`, in join order.
    pub fn viewers(&self, id: &str) -> Vec<&str> {
        self.viewers
            .get(id)
            .map(|users| users.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Replace all watchlists (e.g. after a fetch from the backend).
    pub fn restore(&mut self, watchlists: Vec<Watchlist>) {
        if let Some(active) = &self.active {
            if !watchlists.iter().any(|w| &w.id == active) {
                self.active = None;
            }
        }
        self.watchlists = watchlists;
        let known = &self.watchlists;
        self.viewers.retain(|id, _| known.iter().any(|w| &w.id == id));
    }

    /// Fold collection traffic into the book. Returns whether anything
    /// changed.
    pub fn apply(&mut self, message: &InboundMessage) -> bool {
        match message {
            InboundMessage::WatchlistUpdate(update) => {
                let stock: Stock = match serde_json::from_value(update.stock.clone()) {
                    Ok(stock) => stock,
                    Err(e) => {
                        warn!(
                            watchlist_id = %update.watchlist_id,
                            error = %e,
                            "Skipping undecodable watchlist stock"
                        );
                        return false;
                    }
                };
                let symbol = stock.symbol.clone();
                let applied = self.modify(&update.watchlist_id, |w| {
                    match w.stocks.iter_mut().find(|s| s.symbol == stock.symbol) {
                        Some(row) => *row = stock,
                        None => w.stocks.push(stock),
                    }
                });
                if applied {
                    debug!(watchlist_id = %update.watchlist_id, %symbol, "Watchlist row updated");
                }
                applied
            }
            InboundMessage::PresenceUpdate(presence) => {
                if self.get(&presence.watchlist_id).is_none() {
                    debug!(watchlist_id = %presence.watchlist_id, "Presence for unknown watchlist");
                    return false;
                }
                let users = self.viewers.entry(presence.watchlist_id.clone()).or_default();
                let changed = match presence.action {
                    PresenceAction::Join => users.insert(presence.user_id.clone()),
                    PresenceAction::Leave => users.shift_remove(&presence.user_id),
                };
                if users.is_empty() {
                    self.viewers.remove(&presence.watchlist_id);
                }
                changed
            }
            _ => false,
        }
    }

    fn modify<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Watchlist),
    {
        match self.watchlists.iter_mut().find(|w| w.id == id) {
            Some(watchlist) => {
                f(watchlist);
                watchlist.updated_at = Utc::now();
                true
            }
            None => {
                debug!(watchlist_id = id, "No such watchlist");
                false
            }
        }
    }
}
