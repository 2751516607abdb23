//! WebSocket message types.
//!
//! Inbound frames are JSON objects tagged by `type`; outbound ops use the same
//! shape. Both directions are plain serde enums so the codec has no state.

use crate::error::{WsError, WsResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Inbound
// ============================================================================

/// Live quote tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
}

/// Status change of one of the user's orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub order_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
    Join,
    Leave,
}

/// A user joined or left a shared watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub user_id: String,
    pub watchlist_id: String,
    pub action: PresenceAction,
}

/// A stock row changed on a shared watchlist. `stock` is passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistUpdate {
    pub watchlist_id: String,
    pub stock: serde_json::Value,
}

/// Headline for a symbol. `news` is passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsAlert {
    pub symbol: String,
    pub news: serde_json::Value,
}

/// Sentiment score for a symbol (computed server-side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub symbol: String,
    pub score: Decimal,
}

/// Decoded inbound feed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    PriceUpdate(PriceUpdate),
    OrderUpdate(OrderUpdate),
    PresenceUpdate(PresenceUpdate),
    WatchlistUpdate(WatchlistUpdate),
    NewsAlert(NewsAlert),
    #[serde(rename = "trackk_score_update")]
    ScoreUpdate(ScoreUpdate),
}

impl InboundMessage {
    /// Wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PriceUpdate(_) => "price_update",
            Self::OrderUpdate(_) => "order_update",
            Self::PresenceUpdate(_) => "presence_update",
            Self::WatchlistUpdate(_) => "watchlist_update",
            Self::NewsAlert(_) => "news_alert",
            Self::ScoreUpdate(_) => "trackk_score_update",
        }
    }

    /// Symbol this message is about, if it is symbol-scoped.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::PriceUpdate(m) => Some(&m.symbol),
            Self::NewsAlert(m) => Some(&m.symbol),
            Self::ScoreUpdate(m) => Some(&m.symbol),
            Self::OrderUpdate(_) | Self::PresenceUpdate(_) | Self::WatchlistUpdate(_) => None,
        }
    }

    /// Watchlist this message is about, if it is collection-scoped.
    pub fn watchlist_id(&self) -> Option<&str> {
        match self {
            Self::PresenceUpdate(m) => Some(&m.watchlist_id),
            Self::WatchlistUpdate(m) => Some(&m.watchlist_id),
            _ => None,
        }
    }
}

/// Decode one text frame.
pub fn decode_frame(text: &str) -> WsResult<InboundMessage> {
    serde_json::from_str(text).map_err(|e| WsError::ParseError(e.to_string()))
}

// ============================================================================
// Outbound
// ============================================================================

/// Client-to-server operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    Subscribe {
        symbol: String,
    },
    Unsubscribe {
        symbol: String,
    },
    SubscribeWatchlist {
        #[serde(rename = "watchlistId")]
        watchlist_id: String,
    },
    UnsubscribeWatchlist {
        #[serde(rename = "watchlistId")]
        watchlist_id: String,
    },
}

impl ClientRequest {
    pub fn subscribe(symbol: impl Into<String>) -> Self {
        Self::Subscribe {
            symbol: symbol.into(),
        }
    }

    pub fn unsubscribe(symbol: impl Into<String>) -> Self {
        Self::Unsubscribe {
            symbol: symbol.into(),
        }
    }

    pub fn subscribe_watchlist(watchlist_id: impl Into<String>) -> Self {
        Self::SubscribeWatchlist {
            watchlist_id: watchlist_id.into(),
        }
    }

    pub fn unsubscribe_watchlist(watchlist_id: impl Into<String>) -> Self {
        Self::UnsubscribeWatchlist {
            watchlist_id: watchlist_id.into(),
        }
    }

    /// Wire tag of this op.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::SubscribeWatchlist { .. } => "subscribe_watchlist",
            Self::UnsubscribeWatchlist { .. } => "unsubscribe_watchlist",
        }
    }

    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> WsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_decode_price_update() {
        let raw = r#"{"type":"price_update","symbol":"NIFTY","price":22450.5,"change":-35.2,"changePercent":-0.16}"#;

        let msg = decode_frame(raw).unwrap();
        assert_eq!(msg.kind(), "price_update");
        assert_eq!(msg.symbol(), Some("NIFTY"));

        let InboundMessage::PriceUpdate(update) = msg else {
            panic!("expected price update");
        };
        assert_eq!(update.price, dec!(22450.5));
        assert_eq!(update.change, dec!(-35.2));
        assert_eq!(update.change_percent, dec!(-0.16));
    }

    #[test]
    fn test_decode_score_update_uses_trackk_tag() {
        let msg = decode_frame(r#"{"type":"trackk_score_update","symbol":"TCS","score":7}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::ScoreUpdate(ScoreUpdate {
                symbol: "TCS".to_string(),
                score: dec!(7),
            })
        );
    }

    #[test]
    fn test_decode_collection_messages() {
        let presence = decode_frame(
            r#"{"type":"presence_update","userId":"u1","watchlistId":"wl-1","action":"join"}"#,
        )
        .unwrap();
        assert_eq!(presence.watchlist_id(), Some("wl-1"));
        assert_eq!(presence.symbol(), None);

        let update = decode_frame(
            r#"{"type":"watchlist_update","watchlistId":"wl-1","stock":{"symbol":"INFY"}}"#,
        )
        .unwrap();
        let InboundMessage::WatchlistUpdate(update) = update else {
            panic!("expected watchlist update");
        };
        assert_eq!(update.stock, json!({"symbol": "INFY"}));
    }

    #[test]
    fn test_decode_rejects_unknown_and_malformed() {
        assert!(matches!(
            decode_frame(r#"{"type":"heartbeat"}"#),
            Err(WsError::ParseError(_))
        ));
        assert!(decode_frame(r#"{"type":"price_update","symbol":"NIFTY"}"#).is_err());
        assert!(decode_frame(r#"{"type":"presence_update","userId":"u","watchlistId":"w","action":"wave"}"#).is_err());
        assert!(decode_frame("not json").is_err());
    }

    #[test]
    fn test_encode_outbound_ops() {
        assert_eq!(
            ClientRequest::subscribe("NIFTY").encode().unwrap(),
            r#"{"type":"subscribe","symbol":"NIFTY"}"#
        );
        assert_eq!(
            ClientRequest::unsubscribe("NIFTY").encode().unwrap(),
            r#"{"type":"unsubscribe","symbol":"NIFTY"}"#
        );
        assert_eq!(
            ClientRequest::subscribe_watchlist("wl-1").encode().unwrap(),
            r#"{"type":"subscribe_watchlist","watchlistId":"wl-1"}"#
        );
        assert_eq!(
            ClientRequest::unsubscribe_watchlist("wl-1").encode().unwrap(),
            r#"{"type":"unsubscribe_watchlist","watchlistId":"wl-1"}"#
        );
    }
}
