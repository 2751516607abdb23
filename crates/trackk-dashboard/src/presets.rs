//! Layout presets: built-in and user-authored widget templates.
//!
//! Applying a preset never touches the dashboard by itself; it returns a
//! fresh widget group whose ids are derived from the template ids.

use crate::error::DashboardResult;
use crate::state::DashboardState;
use tracing::{debug, info, warn};
use trackk_core::{
    ChartConfig, ChartInterval, GridPosition, OrderBookConfig, PortfolioConfig, Preset,
    PresetCategory, PresetDraft, PresetId, ScoreConfig, WatchlistWidgetConfig, Widget,
    WidgetConfig, WidgetId,
};

#[derive(Debug, Clone)]
pub struct PresetEngine {
    builtins: Vec<Preset>,
    user: Vec<Preset>,
}

impl PresetEngine {
    /// Engine with the built-in presets and no user presets.
    pub fn new() -> DashboardResult<Self> {
        Ok(Self {
            builtins: builtin_presets()?,
            user: Vec::new(),
        })
    }

    /// Instantiate preset `id` as a new widget group.
    ///
    /// Every widget gets an id of the form `{template}-{unix_ms}-{random}`;
    /// position, config and pin state are copied. Unknown ids yield an empty
    /// group.
    pub fn apply_preset(&self, id: &PresetId) -> Vec<Widget> {
        let Some(preset) = self.preset(id) else {
            debug!(preset_id = %id, "apply_preset: no such preset");
            return Vec::new();
        };

        preset
            .widgets
            .iter()
            .map(|template| Widget {
                id: WidgetId::derived_from(&template.id),
                ..template.clone()
            })
            .collect()
    }

    /// Swap the whole dashboard for a fresh instance of preset `id`.
    ///
    /// Returns false, leaving the dashboard untouched, if the preset is
    /// unknown.
    pub fn switch_to(&self, state: &mut DashboardState, id: &PresetId) -> bool {
        if self.preset(id).is_none() {
            return false;
        }
        let widgets = self.apply_preset(id);
        info!(preset_id = %id, widgets = widgets.len(), "Preset applied");
        state.replace_widgets(widgets);
        true
    }

    /// Store a user preset under a fresh `user-preset-…` id.
    pub fn add_user_preset(&mut self, draft: PresetDraft) -> PresetId {
        let preset = Preset::from(draft);
        let id = preset.id.clone();
        debug!(preset_id = %id, name = %preset.name, "User preset added");
        self.user.push(preset);
        id
    }

    /// Delete a user preset. Built-in ids are never matched.
    pub fn delete_user_preset(&mut self, id: &PresetId) -> bool {
        let before = self.user.len();
        self.user.retain(|p| &p.id != id);
        self.user.len() != before
    }

    /// Look up a preset, built-ins first.
    pub fn preset(&self, id: &PresetId) -> Option<&Preset> {
        self.all_presets().find(|p| &p.id == id)
    }

    pub fn builtin_presets(&self) -> &[Preset] {
        &self.builtins
    }

    pub fn user_presets(&self) -> &[Preset] {
        &self.user
    }

    pub fn all_presets(&self) -> impl Iterator<Item = &Preset> {
        self.builtins.iter().chain(self.user.iter())
    }

    /// Replace the user presets with previously persisted ones. Entries that
    /// collide with a built-in id are dropped.
    pub fn restore_user_presets(&mut self, presets: Vec<Preset>) {
        let builtins = &self.builtins;
        self.user = presets
            .into_iter()
            .filter(|p| {
                let clash = builtins.iter().any(|b| b.id == p.id);
                if clash {
                    warn!(preset_id = %p.id, "Ignoring stored preset that shadows a built-in");
                }
                !clash
            })
            .collect();
    }
}

fn template(id: &str, x: u32, y: u32, w: u32, h: u32, config: WidgetConfig) -> DashboardResult<Widget> {
    Ok(Widget::new(id, GridPosition::new(x, y, w, h)?, config)?)
}

fn chart(symbol: &str, interval: ChartInterval) -> WidgetConfig {
    WidgetConfig::Chart(ChartConfig::new(symbol, interval))
}

fn watchlist(name: &str) -> WidgetConfig {
    WidgetConfig::Watchlist(WatchlistWidgetConfig::named(name))
}

fn score(symbol: &str) -> WidgetConfig {
    WidgetConfig::Score(ScoreConfig::for_symbol(symbol))
}

fn preset(
    id: &str,
    name: &str,
    description: &str,
    category: PresetCategory,
    icon: &str,
    widgets: Vec<Widget>,
) -> Preset {
    Preset {
        id: PresetId::from(id),
        name: name.to_string(),
        description: description.to_string(),
        category,
        icon: icon.to_string(),
        widgets,
    }
}

/// The presets shipped with the client.
fn builtin_presets() -> DashboardResult<Vec<Preset>> {
    use ChartInterval::{FiveMinutes, OneDay};

    Ok(vec![
        preset(
            "day-trader",
            "Day Trader",
            "Optimized for active day trading with multiple charts and order book",
            PresetCategory::Trading,
            "⚡",
            vec![
                template("chart-1", 0, 0, 8, 6, chart("NIFTY", FiveMinutes))?,
                template("chart-2", 8, 0, 4, 6, chart("BANKNIFTY", FiveMinutes))?,
                template("watchlist-1", 0, 6, 4, 4, watchlist("Active Trades"))?,
                template(
                    "orderbook-1",
                    4,
                    6,
                    4,
                    4,
                    WidgetConfig::Orderbook(OrderBookConfig::default()),
                )?,
                template("score-1", 8, 6, 4, 4, score("NIFTY"))?,
            ],
        ),
        preset(
            "researcher",
            "Researcher",
            "Deep research workspace with score breakdown and news",
            PresetCategory::Research,
            "🔬",
            vec![
                template("chart-1", 0, 0, 6, 5, chart("RELIANCE", OneDay))?,
                template("score-1", 6, 0, 6, 5, score("RELIANCE"))?,
                template("news-1", 0, 5, 6, 5, WidgetConfig::News(Default::default()))?,
                template("watchlist-1", 6, 5, 6, 5, watchlist("Research List"))?,
            ],
        ),
        preset(
            "portfolio-manager",
            "Portfolio Manager",
            "Focus on portfolio tracking and performance",
            PresetCategory::Analysis,
            "📊",
            vec![
                template(
                    "portfolio-1",
                    0,
                    0,
                    6,
                    6,
                    WidgetConfig::Portfolio(PortfolioConfig::default()),
                )?,
                template("chart-1", 6, 0, 6, 4, chart("PORTFOLIO", OneDay))?,
                template("watchlist-1", 6, 4, 6, 4, watchlist("Holdings"))?,
            ],
        ),
        preset(
            "minimal",
            "Minimal",
            "Clean, focused workspace",
            PresetCategory::Custom,
            "✨",
            vec![template("chart-1", 0, 0, 12, 8, chart("NIFTY", OneDay))?],
        ),
    ])
}
