//! Core domain types for the Trackk dashboard client.
//!
//! This crate provides the types shared by the live-data client and the
//! dashboard state machine:
//! - `Widget`, `WidgetConfig`, `GridPosition`: validated widget model
//! - `Layout`, `Preset`: saved snapshots and widget templates
//! - `Stock`, `Watchlist`: market data shapes
//! - `WidgetId`, `LayoutId`, `PresetId`: identifiers

pub mod error;
pub mod ids;
pub mod layout;
pub mod market;
pub mod widget;

pub use error::{CoreError, Result};
pub use ids::{LayoutId, PresetId, WidgetId};
pub use layout::{Layout, Preset, PresetCategory, PresetDraft};
pub use market::{Exchange, Sentiment, Stock, Watchlist};
pub use widget::{
    validate_symbol, ChartConfig, ChartInterval, CustomConfig, DataDependencies, GridPosition,
    NewsConfig, OrderBookConfig, PortfolioConfig, ScoreConfig, WatchlistSort,
    WatchlistWidgetConfig, Widget, WidgetConfig, WidgetKind, WidgetPatch, GRID_COLUMNS, MAX_SPAN,
    MIN_SPAN,
};
