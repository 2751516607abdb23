//! Dashboard widget types.
//!
//! A widget's type is the tag of its [`WidgetConfig`], so the type and the
//! configuration can never disagree. Grid positions are validated on
//! construction and on deserialization.

use crate::error::{CoreError, Result};
use crate::ids::WidgetId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of columns in the dashboard grid.
pub const GRID_COLUMNS: u32 = 12;
/// Minimum widget width/height in grid cells.
pub const MIN_SPAN: u32 = 2;
/// Maximum widget width/height in grid cells.
pub const MAX_SPAN: u32 = 12;

const MAX_SYMBOL_LEN: usize = 32;
const MAX_ORDERBOOK_DEPTH: u32 = 50;
const MAX_NEWS_ITEMS: usize = 100;

// ============================================================================
// Grid position
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawGridPosition {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Widget placement in grid cell units.
///
/// Always satisfies `w, h ∈ [MIN_SPAN, MAX_SPAN]`; `x`/`y` are non-negative
/// by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGridPosition", into = "RawGridPosition")]
pub struct GridPosition {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl GridPosition {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Result<Self> {
        for (name, span) in [("w", w), ("h", h)] {
            if !(MIN_SPAN..=MAX_SPAN).contains(&span) {
                return Err(CoreError::InvalidPosition(format!(
                    "{name}={span} outside [{MIN_SPAN}, {MAX_SPAN}]"
                )));
            }
        }
        Ok(Self { x, y, w, h })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn w(&self) -> u32 {
        self.w
    }

    pub fn h(&self) -> u32 {
        self.h
    }
}

impl TryFrom<RawGridPosition> for GridPosition {
    type Error = CoreError;

    fn try_from(raw: RawGridPosition) -> Result<Self> {
        Self::new(raw.x, raw.y, raw.w, raw.h)
    }
}

impl From<GridPosition> for RawGridPosition {
    fn from(p: GridPosition) -> Self {
        Self {
            x: p.x,
            y: p.y,
            w: p.w,
            h: p.h,
        }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{} {}x{})", self.x, self.y, self.w, self.h)
    }
}

// ============================================================================
// Widget kinds and per-kind configuration
// ============================================================================

/// Widget type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Chart,
    Watchlist,
    Portfolio,
    News,
    Score,
    Orderbook,
    Custom,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Watchlist => "watchlist",
            Self::Portfolio => "portfolio",
            Self::News => "news",
            Self::Score => "score",
            Self::Orderbook => "orderbook",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chart candle interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChartInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartConfig {
    pub symbol: String,
    pub interval: ChartInterval,
    pub indicators: Vec<String>,
    pub overlays: Vec<String>,
    pub show_volume: bool,
    pub show_trackk_score: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            symbol: "NIFTY".to_string(),
            interval: ChartInterval::OneDay,
            indicators: Vec::new(),
            overlays: Vec::new(),
            show_volume: true,
            show_trackk_score: false,
        }
    }
}

impl ChartConfig {
    pub fn new(symbol: impl Into<String>, interval: ChartInterval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            ..Default::default()
        }
    }
}

/// Column a watchlist widget sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WatchlistSort {
    #[default]
    ChangePercent,
    Price,
    Volume,
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchlistWidgetConfig {
    pub name: String,
    /// Shared watchlist this widget follows for live presence/updates.
    pub watchlist_id: Option<String>,
    pub sort_by: WatchlistSort,
    pub columns: Vec<String>,
}

impl Default for WatchlistWidgetConfig {
    fn default() -> Self {
        Self {
            name: "My Watchlist".to_string(),
            watchlist_id: None,
            sort_by: WatchlistSort::ChangePercent,
            columns: ["symbol", "price", "change", "volume"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl WatchlistWidgetConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioConfig {
    pub compact: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsConfig {
    /// Symbols to follow; empty means the general market feed.
    pub symbols: Vec<String>,
    pub max_items: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            max_items: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreConfig {
    pub symbol: String,
    pub show_breakdown: bool,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            symbol: "NIFTY".to_string(),
            show_breakdown: true,
        }
    }
}

impl ScoreConfig {
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderBookConfig {
    pub symbol: Option<String>,
    pub depth: u32,
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        Self {
            symbol: None,
            depth: 10,
        }
    }
}

/// Free-form settings for user-defined widgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomConfig {
    pub title: String,
    pub settings: serde_json::Map<String, serde_json::Value>,
}

/// Per-type widget configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WidgetConfig {
    Chart(ChartConfig),
    Watchlist(WatchlistWidgetConfig),
    Portfolio(PortfolioConfig),
    News(NewsConfig),
    Score(ScoreConfig),
    Orderbook(OrderBookConfig),
    Custom(CustomConfig),
}

impl WidgetConfig {
    /// Default configuration for a widget kind.
    pub fn default_for(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::Chart => Self::Chart(ChartConfig::default()),
            WidgetKind::Watchlist => Self::Watchlist(WatchlistWidgetConfig::default()),
            WidgetKind::Portfolio => Self::Portfolio(PortfolioConfig::default()),
            WidgetKind::News => Self::News(NewsConfig::default()),
            WidgetKind::Score => Self::Score(ScoreConfig::default()),
            WidgetKind::Orderbook => Self::Orderbook(OrderBookConfig::default()),
            WidgetKind::Custom => Self::Custom(CustomConfig::default()),
        }
    }

    pub fn kind(&self) -> WidgetKind {
        match self {
            Self::Chart(_) => WidgetKind::Chart,
            Self::Watchlist(_) => WidgetKind::Watchlist,
            Self::Portfolio(_) => WidgetKind::Portfolio,
            Self::News(_) => WidgetKind::News,
            Self::Score(_) => WidgetKind::Score,
            Self::Orderbook(_) => WidgetKind::Orderbook,
            Self::Custom(_) => WidgetKind::Custom,
        }
    }

    /// Check the configuration against its type's rules.
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind().as_str();
        let invalid = |reason: String| CoreError::InvalidConfig { kind, reason };

        match self {
            Self::Chart(c) => validate_symbol(&c.symbol),
            Self::Score(c) => validate_symbol(&c.symbol),
            Self::Watchlist(c) => {
                if c.name.trim().is_empty() {
                    return Err(invalid("name must not be empty".to_string()));
                }
                if c.watchlist_id.as_deref().is_some_and(|id| id.is_empty()) {
                    return Err(invalid("watchlistId must not be empty".to_string()));
                }
                Ok(())
            }
            Self::News(c) => {
                if c.max_items == 0 || c.max_items > MAX_NEWS_ITEMS {
                    return Err(invalid(format!(
                        "maxItems={} outside [1, {MAX_NEWS_ITEMS}]",
                        c.max_items
                    )));
                }
                c.symbols.iter().try_for_each(|s| validate_symbol(s))
            }
            Self::Orderbook(c) => {
                if c.depth == 0 || c.depth > MAX_ORDERBOOK_DEPTH {
                    return Err(invalid(format!(
                        "depth={} outside [1, {MAX_ORDERBOOK_DEPTH}]",
                        c.depth
                    )));
                }
                c.symbol.as_deref().map_or(Ok(()), validate_symbol)
            }
            Self::Portfolio(_) | Self::Custom(_) => Ok(()),
        }
    }

    /// Live data keys this configuration needs.
    pub fn dependencies(&self) -> DataDependencies {
        let mut deps = DataDependencies::default();
        match self {
            Self::Chart(c) => deps.symbols.push(c.symbol.clone()),
            Self::Score(c) => deps.symbols.push(c.symbol.clone()),
            Self::News(c) => deps.symbols.extend(c.symbols.iter().cloned()),
            Self::Orderbook(c) => deps.symbols.extend(c.symbol.iter().cloned()),
            Self::Watchlist(c) => deps.collections.extend(c.watchlist_id.iter().cloned()),
            Self::Portfolio(_) | Self::Custom(_) => {}
        }
        deps
    }
}

/// Check a ticker symbol: non-empty, bounded length, no whitespace.
pub fn validate_symbol(symbol: &str) -> Result<()> {
    let ok = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '&' | '-' | '_' | '.' | ':'));
    if ok {
        Ok(())
    } else {
        Err(CoreError::InvalidSymbol(symbol.to_string()))
    }
}

/// Live data keys declared by one or more widgets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDependencies {
    /// Symbol-level subscriptions.
    pub symbols: Vec<String>,
    /// Collection-level subscriptions (shared watchlist ids).
    pub collections: Vec<String>,
}

impl DataDependencies {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.collections.is_empty()
    }
}

// ============================================================================
// Widget
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWidget {
    id: WidgetId,
    position: GridPosition,
    config: WidgetConfig,
    #[serde(default)]
    is_pinned: bool,
}

/// A positioned, configured unit of the dashboard grid.
///
/// Deserializing runs the same configuration checks as [`Widget::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawWidget")]
pub struct Widget {
    pub id: WidgetId,
    pub position: GridPosition,
    pub config: WidgetConfig,
    #[serde(default)]
    pub is_pinned: bool,
}

impl Widget {
    /// Create an unpinned widget, validating its configuration.
    pub fn new(id: impl Into<WidgetId>, position: GridPosition, config: WidgetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id: id.into(),
            position,
            config,
            is_pinned: false,
        })
    }

    pub fn kind(&self) -> WidgetKind {
        self.config.kind()
    }

    pub fn dependencies(&self) -> DataDependencies {
        self.config.dependencies()
    }
}

impl TryFrom<RawWidget> for Widget {
    type Error = CoreError;

    fn try_from(raw: RawWidget) -> Result<Self> {
        let mut widget = Self::new(raw.id, raw.position, raw.config)?;
        widget.is_pinned = raw.is_pinned;
        Ok(widget)
    }
}

/// Partial widget update. Fields left `None` are preserved.
///
/// `config` replaces the whole configuration value; it is not merged per
/// field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetPatch {
    position: Option<GridPosition>,
    config: Option<WidgetConfig>,
    is_pinned: Option<bool>,
}

impl WidgetPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: GridPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_config(mut self, config: WidgetConfig) -> Result<Self> {
        config.validate()?;
        self.config = Some(config);
        Ok(self)
    }

    pub fn with_pinned(mut self, pinned: bool) -> Self {
        self.is_pinned = Some(pinned);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.config.is_none() && self.is_pinned.is_none()
    }

    /// Merge this patch into `widget`.
    pub fn apply_to(self, widget: &mut Widget) {
        if let Some(position) = self.position {
            widget.position = position;
        }
        if let Some(config) = self.config {
            widget.config = config;
        }
        if let Some(pinned) = self.is_pinned {
            widget.is_pinned = pinned;
        }
    }
}
