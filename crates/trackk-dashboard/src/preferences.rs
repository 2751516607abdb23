//! User preferences and the widget defaults they imply.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use trackk_core::{
    ChartConfig, ChartInterval, LayoutId, WatchlistSort, WatchlistWidgetConfig, WidgetConfig,
    WidgetKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetDensity {
    Compact,
    #[default]
    Comfortable,
    Spacious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "MARKET")]
    Market,
    #[default]
    #[serde(rename = "LIMIT")]
    Limit,
    #[serde(rename = "SL")]
    StopLoss,
    #[serde(rename = "SL-M")]
    StopLossMarket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchDepth {
    Basic,
    #[default]
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartDefaults {
    pub default_interval: ChartInterval,
    pub default_indicators: Vec<String>,
    pub show_volume: bool,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self {
            default_interval: ChartInterval::OneDay,
            default_indicators: Vec::new(),
            show_volume: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatchlistDefaults {
    pub default_columns: Vec<String>,
    pub sort_by: WatchlistSort,
}

impl Default for WatchlistDefaults {
    fn default() -> Self {
        Self {
            default_columns: WatchlistWidgetConfig::default().columns,
            sort_by: WatchlistSort::ChangePercent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetDefaults {
    pub chart: ChartDefaults,
    pub watchlist: WatchlistDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    // Layout
    pub default_layout: Option<LayoutId>,
    pub widget_density: WidgetDensity,
    pub show_grid_lines: bool,
    pub snap_to_grid: bool,

    // Trading
    pub default_order_type: OrderType,
    pub default_quantity: u32,
    pub show_advanced_order_types: bool,

    // Research
    pub show_score_breakdown: bool,
    pub show_source_attribution: bool,
    pub research_depth: ResearchDepth,

    // Notifications
    pub price_alerts: bool,
    pub order_updates: bool,
    pub recommendations: bool,
    pub social: bool,
    pub market_news: bool,

    /// Action name to key chord.
    pub keyboard_shortcuts: IndexMap<String, String>,
    pub widget_defaults: WidgetDefaults,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_layout: None,
            widget_density: WidgetDensity::Comfortable,
            show_grid_lines: false,
            snap_to_grid: true,
            default_order_type: OrderType::Limit,
            default_quantity: 1,
            show_advanced_order_types: false,
            show_score_breakdown: true,
            show_source_attribution: true,
            research_depth: ResearchDepth::Intermediate,
            price_alerts: true,
            order_updates: true,
            recommendations: true,
            social: true,
            market_news: true,
            keyboard_shortcuts: [
                ("search", "cmd+k"),
                ("addChart", "cmd+shift+c"),
                ("addWatchlist", "cmd+shift+w"),
            ]
            .into_iter()
            .map(|(action, keys)| (action.to_string(), keys.to_string()))
            .collect(),
            widget_defaults: WidgetDefaults::default(),
        }
    }
}

impl UserPreferences {
    /// Apply an edit in place.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        f(self);
    }

    /// Back to factory defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Starting config for a new widget of `kind`, honouring the user's
    /// chart and watchlist defaults.
    pub fn widget_config(&self, kind: WidgetKind) -> WidgetConfig {
        let defaults = &self.widget_defaults;
        match kind {
            WidgetKind::Chart => WidgetConfig::Chart(ChartConfig {
                interval: defaults.chart.default_interval,
                indicators: defaults.chart.default_indicators.clone(),
                show_volume: defaults.chart.show_volume,
                ..ChartConfig::default()
            }),
            WidgetKind::Watchlist => WidgetConfig::Watchlist(WatchlistWidgetConfig {
                columns: defaults.watchlist.default_columns.clone(),
                sort_by: defaults.watchlist.sort_by,
                ..WatchlistWidgetConfig::default()
            }),
            WidgetKind::Score => {
                let mut config = WidgetConfig::default_for(WidgetKind::Score);
                if let WidgetConfig::Score(score) = &mut config {
                    score.show_breakdown = self.show_score_breakdown;
                }
                config
            }
            other => WidgetConfig::default_for(other),
        }
    }
}
