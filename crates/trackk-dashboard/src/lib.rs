//! Dashboard composition state for the Trackk client.
//!
//! Provides:
//! - `DashboardState`: live widgets, saved layouts, drag/expand flags
//! - `PresetEngine`: built-in and user layout presets
//! - `WidgetSettingsController`: buffered per-widget config editing
//! - `LiveFeed`, `WatchlistBook`: display data fed from routed messages
//! - `UserPreferences`: user defaults, including new-widget defaults

pub mod error;
pub mod feed;
pub mod preferences;
pub mod presets;
pub mod settings;
pub mod state;
pub mod watchlists;

pub use error::{DashboardError, DashboardResult};
pub use feed::{LiveFeed, PricePoint, Quote};
pub use preferences::{
    ChartDefaults, OrderType, ResearchDepth, UserPreferences, WatchlistDefaults, WidgetDefaults,
    WidgetDensity,
};
pub use presets::PresetEngine;
pub use settings::WidgetSettingsController;
pub use state::DashboardState;
pub use watchlists::WatchlistBook;
