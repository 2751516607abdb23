//! Widget-facing cache of live feed data.
//!
//! Holds the latest value per key plus short histories for chart and news
//! widgets. Filled from routed inbound messages; symbols are stored exactly
//! as they arrive on the wire.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use tracing::trace;
use trackk_ws::InboundMessage;

/// Price points kept per symbol.
pub const DEFAULT_SERIES_CAPACITY: usize = 500;
/// Headlines kept per symbol.
pub const DEFAULT_NEWS_CAPACITY: usize = 100;
/// Order statuses kept; the least recently updated order is evicted first.
pub const DEFAULT_ORDER_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub at: DateTime<Utc>,
    pub price: Decimal,
}

#[derive(Debug, Clone)]
pub struct LiveFeed {
    quotes: HashMap<String, Quote>,
    series: HashMap<String, VecDeque<PricePoint>>,
    scores: HashMap<String, Decimal>,
    /// Newest first.
    news: HashMap<String, VecDeque<serde_json::Value>>,
    /// Latest status per order id, least recently updated first.
    orders: IndexMap<String, String>,
    series_capacity: usize,
    news_capacity: usize,
    order_capacity: usize,
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SERIES_CAPACITY, DEFAULT_NEWS_CAPACITY)
    }
}

impl LiveFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(series_capacity: usize, news_capacity: usize) -> Self {
        Self {
            quotes: HashMap::new(),
            series: HashMap::new(),
            scores: HashMap::new(),
            news: HashMap::new(),
            orders: IndexMap::new(),
            series_capacity: series_capacity.max(1),
            news_capacity: news_capacity.max(1),
            order_capacity: DEFAULT_ORDER_CAPACITY,
        }
    }

    pub fn with_order_capacity(mut self, capacity: usize) -> Self {
        self.order_capacity = capacity.max(1);
        self
    }

    /// Fold one message into the cache. Returns false for message kinds the
    /// feed does not hold (watchlist traffic).
    pub fn apply(&mut self, message: &InboundMessage) -> bool {
        let now = Utc::now();
        match message {
            InboundMessage::PriceUpdate(update) => {
                self.quotes.insert(
                    update.symbol.clone(),
                    Quote {
                        price: update.price,
                        change: update.change,
                        change_percent: update.change_percent,
                        received_at: now,
                    },
                );
                let series = self.series.entry(update.symbol.clone()).or_default();
                series.push_back(PricePoint {
                    at: now,
                    price: update.price,
                });
                while series.len() > self.series_capacity {
                    series.pop_front();
                }
            }
            InboundMessage::ScoreUpdate(update) => {
                self.scores.insert(update.symbol.clone(), update.score);
            }
            InboundMessage::NewsAlert(alert) => {
                let items = self.news.entry(alert.symbol.clone()).or_default();
                items.push_front(alert.news.clone());
                items.truncate(self.news_capacity);
            }
            InboundMessage::OrderUpdate(update) => {
                self.orders.shift_remove(&update.order_id);
                self.orders
                    .insert(update.order_id.clone(), update.status.clone());
                while self.orders.len() > self.order_capacity {
                    self.orders.shift_remove_index(0);
                }
            }
            InboundMessage::PresenceUpdate(_) | InboundMessage::WatchlistUpdate(_) => {
                return false;
            }
        }
        trace!(kind = message.kind(), "Feed updated");
        true
    }

    pub fn quote(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// Price history for `symbol`, oldest first.
    pub fn series(&self, symbol: &str) -> impl Iterator<Item = &PricePoint> {
        self.series.get(symbol).into_iter().flatten()
    }

    pub fn score(&self, symbol: &str) -> Option<Decimal> {
        self.scores.get(symbol).copied()
    }

    /// Up to `limit` headlines for `symbol`, newest first.
    pub fn news(&self, symbol: &str, limit: usize) -> Vec<&serde_json::Value> {
        self.news
            .get(symbol)
            .map(|items| items.iter().take(limit).collect())
            .unwrap_or_default()
    }

    pub fn order_status(&self, order_id: &str) -> Option<&str> {
        self.orders.get(order_id).map(String::as_str)
    }

    pub fn orders(&self) -> impl Iterator<Item = (&str, &str)> {
        self.orders.iter().map(|(id, status)| (id.as_str(), status.as_str()))
    }

    /// Drop cached data for symbols no widget needs any more.
    pub fn retain_symbols(&mut self, symbols: &[String]) {
        let keep = |symbol: &String| symbols.contains(symbol);
        self.quotes.retain(|s, _| keep(s));
        self.series.retain(|s, _| keep(s));
        self.scores.retain(|s, _| keep(s));
        self.news.retain(|s, _| keep(s));
    }
}
