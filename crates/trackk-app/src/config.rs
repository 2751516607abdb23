//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trackk_dashboard::feed::{DEFAULT_NEWS_CAPACITY, DEFAULT_SERIES_CAPACITY};
use trackk_ws::ConnectionConfig;

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV: &str = "TRACKK_TOKEN";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Live-data connection.
    pub ws: WsSettings,

    /// Where layouts, user presets and preferences are kept between runs.
    #[serde(default = "default_workspace_path")]
    pub workspace_path: PathBuf,

    /// Preset applied when no saved workspace exists.
    #[serde(default = "default_preset")]
    pub default_preset: String,

    #[serde(default)]
    pub feed: FeedSettings,

    /// Prometheus textfile written on every status tick and at shutdown.
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsSettings {
    #[serde(flatten)]
    pub connection: ConnectionConfig,

    /// Auth token passed as `?token=`. Falls back to `TRACKK_TOKEN`.
    #[serde(default)]
    pub token: Option<String>,
}

/// History kept per symbol for chart and news widgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_series_capacity")]
    pub series_capacity: usize,
    #[serde(default = "default_news_capacity")]
    pub news_capacity: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            series_capacity: default_series_capacity(),
            news_capacity: default_news_capacity(),
        }
    }
}

fn default_workspace_path() -> PathBuf {
    PathBuf::from("data/workspace.json")
}

fn default_preset() -> String {
    "day-trader".to_string()
}

fn default_series_capacity() -> usize {
    DEFAULT_SERIES_CAPACITY
}

fn default_news_capacity() -> usize {
    DEFAULT_NEWS_CAPACITY
}

impl AppConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        let url = &self.ws.connection.url;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "ws.url must start with ws:// or wss://, got {url:?}"
            )));
        }
        if self.default_preset.trim().is_empty() {
            return Err(AppError::Config("default_preset must not be empty".to_string()));
        }
        Ok(())
    }

    /// Configured token, else `TRACKK_TOKEN`. Empty values count as unset.
    pub fn token(&self) -> Option<String> {
        self.ws
            .token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
    }
}
