//! On-disk workspace: everything the dashboard keeps between runs.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use trackk_core::{Layout, LayoutId, Preset, Watchlist, Widget};
use trackk_dashboard::{DashboardState, PresetEngine, UserPreferences, WatchlistBook};

pub const WORKSPACE_VERSION: u32 = 1;

/// Serialized dashboard workspace (JSON).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFile {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(default)]
    pub layouts: Vec<Layout>,
    #[serde(default)]
    pub current_layout: Option<LayoutId>,
    #[serde(default)]
    pub user_presets: Vec<Preset>,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub watchlists: Vec<Watchlist>,
}

impl WorkspaceFile {
    pub fn capture(
        state: &DashboardState,
        presets: &PresetEngine,
        preferences: &UserPreferences,
        watchlists: &WatchlistBook,
    ) -> Self {
        Self {
            version: WORKSPACE_VERSION,
            widgets: state.widgets().to_vec(),
            layouts: state.layouts().to_vec(),
            current_layout: state.current_layout().map(|l| l.id.clone()),
            user_presets: presets.user_presets().to_vec(),
            preferences: preferences.clone(),
            watchlists: watchlists.watchlists().to_vec(),
        }
    }

    pub fn restore_into(
        self,
        state: &mut DashboardState,
        presets: &mut PresetEngine,
        preferences: &mut UserPreferences,
        watchlists: &mut WatchlistBook,
    ) {
        state.replace_widgets(self.widgets);
        state.restore_layouts(self.layouts, self.current_layout);
        presets.restore_user_presets(self.user_presets);
        *preferences = self.preferences;
        watchlists.restore(self.watchlists);
    }

    /// Read a workspace file. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> AppResult<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No workspace file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let workspace: Self = serde_json::from_str(&content).map_err(|e| {
            AppError::Workspace(format!("Failed to parse {}: {e}", path.display()))
        })?;
        if workspace.version > WORKSPACE_VERSION {
            return Err(AppError::Workspace(format!(
                "{} was written by a newer client (version {})",
                path.display(),
                workspace.version
            )));
        }

        info!(
            path = %path.display(),
            widgets = workspace.widgets.len(),
            layouts = workspace.layouts.len(),
            "Workspace loaded"
        );
        Ok(Some(workspace))
    }

    /// Write atomically: a sibling temp file is renamed over `path`.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Workspace(format!("Failed to serialize workspace: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;

        debug!(path = %path.display(), widgets = self.widgets.len(), "Workspace saved");
        Ok(())
    }
}
