//! Market data shapes shared by the feed and the watchlist book.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    #[serde(rename = "NSE")]
    Nse,
    #[serde(rename = "BSE")]
    Bse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

/// Quote row as carried by watchlists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub exchange: Exchange,
    pub price: Decimal,
    #[serde(default)]
    pub change: Decimal,
    #[serde(default)]
    pub change_percent: Decimal,
    #[serde(default)]
    pub volume: u64,
    #[serde(default)]
    pub market_cap: Decimal,
    #[serde(default)]
    pub trackk_score: Decimal,
    #[serde(default)]
    pub sentiment: Sentiment,
    pub last_updated: Option<DateTime<Utc>>,
}

/// A named list of stocks, optionally shared with other users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watchlist {
    pub id: String,
    pub name: String,
    pub stocks: Vec<Stock>,
    pub is_shared: bool,
    pub shared_with: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Watchlist {
    /// Fresh id: `watchlist-{timestamp_ms}-{random}`.
    pub fn generate_id() -> String {
        crate::ids::timestamped("watchlist")
    }

    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            stocks: Vec::new(),
            is_shared: false,
            shared_with: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.stocks.iter().any(|s| s.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_stock_from_feed_payload() {
        let stock: Stock = serde_json::from_value(json!({
            "symbol": "RELIANCE",
            "name": "Reliance Industries",
            "exchange": "NSE",
            "price": 2950.5,
            "changePercent": 1.25,
            "sentiment": "bullish"
        }))
        .unwrap();

        assert_eq!(stock.exchange, Exchange::Nse);
        assert_eq!(stock.price, dec!(2950.5));
        assert_eq!(stock.change_percent, dec!(1.25));
        assert_eq!(stock.change, Decimal::ZERO);
        assert_eq!(stock.sentiment, Sentiment::Bullish);
        assert!(stock.last_updated.is_none());
    }
}
