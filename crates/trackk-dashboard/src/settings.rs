//! Edit session for one widget's configuration.
//!
//! The controller is either closed or editing exactly one widget. Edits go
//! to a buffer; nothing reaches the dashboard until `save`.

use crate::error::{DashboardError, DashboardResult};
use crate::state::DashboardState;
use tracing::debug;
use trackk_core::{WidgetConfig, WidgetId, WidgetPatch};

#[derive(Debug, Clone)]
struct Session {
    widget_id: WidgetId,
    /// Committed config at open time; used by `reset` if the widget is gone.
    opened_with: WidgetConfig,
    buffer: WidgetConfig,
}

#[derive(Debug, Clone, Default)]
pub struct WidgetSettingsController {
    session: Option<Session>,
}

impl WidgetSettingsController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing `id`, replacing any open session.
    pub fn open(&mut self, state: &DashboardState, id: &WidgetId) -> DashboardResult<()> {
        let widget = state
            .widget(id)
            .ok_or_else(|| DashboardError::WidgetNotFound(id.clone()))?;

        if let Some(previous) = &self.session {
            if &previous.widget_id != id {
                debug!(closed = %previous.widget_id, "Discarding open settings session");
            }
        }
        self.session = Some(Session {
            widget_id: id.clone(),
            opened_with: widget.config.clone(),
            buffer: widget.config.clone(),
        });
        Ok(())
    }

    /// Validate the buffer and commit it as the widget's whole config.
    ///
    /// On a validation error the session stays open with the buffer intact.
    pub fn save(&mut self, state: &mut DashboardState) -> DashboardResult<()> {
        let session = self.session.as_ref().ok_or(DashboardError::SettingsClosed)?;
        let patch = WidgetPatch::new().with_config(session.buffer.clone())?;

        if !state.update_widget(&session.widget_id, patch) {
            debug!(widget_id = %session.widget_id, "Saved settings for a removed widget");
        }
        self.session = None;
        Ok(())
    }

    /// Throw away edits: the buffer goes back to the committed config.
    pub fn reset(&mut self, state: &DashboardState) -> DashboardResult<()> {
        let session = self.session.as_mut().ok_or(DashboardError::SettingsClosed)?;
        session.buffer = state
            .widget(&session.widget_id)
            .map(|w| w.config.clone())
            .unwrap_or_else(|| session.opened_with.clone());
        Ok(())
    }

    /// Discard the session without committing.
    pub fn close(&mut self) {
        self.session = None;
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn open_widget_id(&self) -> Option<&WidgetId> {
        self.session.as_ref().map(|s| &s.widget_id)
    }

    pub fn buffer(&self) -> Option<&WidgetConfig> {
        self.session.as_ref().map(|s| &s.buffer)
    }

    pub fn buffer_mut(&mut self) -> Option<&mut WidgetConfig> {
        self.session.as_mut().map(|s| &mut s.buffer)
    }

    /// Apply `f` to the buffer.
    pub fn edit<F>(&mut self, f: F) -> DashboardResult<()>
    where
        F: FnOnce(&mut WidgetConfig),
    {
        let buffer = self.buffer_mut().ok_or(DashboardError::SettingsClosed)?;
        f(buffer);
        Ok(())
    }

    /// Whether the buffer differs from the config it was opened with.
    pub fn is_dirty(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.buffer != s.opened_with)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackk_core::{
        ChartConfig, ChartInterval, GridPosition, ScoreConfig, Widget, WidgetKind,
    };

    fn score_widget(id: &str, symbol: &str) -> Widget {
        Widget::new(
            id,
            GridPosition::new(0, 0, 4, 4).unwrap(),
            WidgetConfig::Score(ScoreConfig::for_symbol(symbol)),
        )
        .unwrap()
    }

    fn set_symbol(config: &mut WidgetConfig, symbol: &str) {
        match config {
            WidgetConfig::Score(c) => c.symbol = symbol.to_string(),
            WidgetConfig::Chart(c) => c.symbol = symbol.to_string(),
            other => panic!("unexpected config {other:?}"),
        }
    }

    fn setup() -> (DashboardState, WidgetSettingsController, WidgetId) {
        let mut state = DashboardState::new();
        state.add_widget(score_widget("w1", "NIFTY"));
        (state, WidgetSettingsController::new(), WidgetId::from("w1"))
    }

    #[test]
    fn test_reset_restores_committed_not_default() {
        let (mut state, mut settings, id) = setup();
        // Committed config differs from the type default.
        state.update_widget(
            &id,
            WidgetPatch::new()
                .with_config(WidgetConfig::Score(ScoreConfig {
                    symbol: "NIFTY".to_string(),
                    show_breakdown: false,
                }))
                .unwrap(),
        );
        let committed = state.widget(&id).unwrap().config.clone();

        settings.open(&state, &id).unwrap();
        settings.edit(|c| set_symbol(c, "SENSEX")).unwrap();
        assert!(settings.is_dirty());

        settings.reset(&state).unwrap();

        assert!(settings.is_open());
        assert_eq!(settings.buffer(), Some(&committed));
        assert_ne!(settings.buffer(), Some(&WidgetConfig::default_for(WidgetKind::Score)));
        assert!(!settings.is_dirty());
    }

    #[test]
    fn test_save_commits_buffer_and_closes() {
        let (mut state, mut settings, id) = setup();
        settings.open(&state, &id).unwrap();
        settings.edit(|c| set_symbol(c, "SENSEX")).unwrap();

        settings.save(&mut state).unwrap();

        assert!(!settings.is_open());
        assert_eq!(
            state.widget(&id).unwrap().config,
            WidgetConfig::Score(ScoreConfig::for_symbol("SENSEX"))
        );
    }

    #[test]
    fn test_invalid_buffer_is_not_committed() {
        let (mut state, mut settings, id) = setup();
        settings.open(&state, &id).unwrap();
        settings.edit(|c| set_symbol(c, "")).unwrap();

        assert!(matches!(settings.save(&mut state), Err(DashboardError::Core(_))));
        assert!(settings.is_open());
        assert_eq!(
            state.widget(&id).unwrap().config,
            WidgetConfig::Score(ScoreConfig::for_symbol("NIFTY"))
        );
    }

    #[test]
    fn test_close_discards_edits() {
        let (mut state, mut settings, id) = setup();
        settings.open(&state, &id).unwrap();
        settings.edit(|c| set_symbol(c, "SENSEX")).unwrap();
        settings.close();

        assert!(!settings.is_open());
        assert!(matches!(settings.save(&mut state), Err(DashboardError::SettingsClosed)));
        assert_eq!(
            state.widget(&id).unwrap().config,
            WidgetConfig::Score(ScoreConfig::for_symbol("NIFTY"))
        );
    }

    #[test]
    fn test_one_session_at_a_time() {
        let (mut state, mut settings, w1) = setup();
        state.add_widget(
            Widget::new(
                "w2",
                GridPosition::new(4, 0, 4, 4).unwrap(),
                WidgetConfig::Chart(ChartConfig::new("TCS", ChartInterval::OneHour)),
            )
            .unwrap(),
        );
        let w2 = WidgetId::from("w2");

        settings.open(&state, &w1).unwrap();
        settings.edit(|c| set_symbol(c, "SENSEX")).unwrap();
        settings.open(&state, &w2).unwrap();

        assert_eq!(settings.open_widget_id(), Some(&w2));
        assert!(!settings.is_dirty());
        settings.save(&mut state).unwrap();
        // w1's edits were dropped with its session.
        assert_eq!(
            state.widget(&w1).unwrap().config,
            WidgetConfig::Score(ScoreConfig::for_symbol("NIFTY"))
        );
    }

    #[test]
    fn test_reset_after_widget_removed_uses_open_snapshot() {
        let (mut state, mut settings, id) = setup();
        settings.open(&state, &id).unwrap();
        settings.edit(|c| set_symbol(c, "SENSEX")).unwrap();
        state.remove_widget(&id);

        settings.reset(&state).unwrap();
        assert_eq!(
            settings.buffer(),
            Some(&WidgetConfig::Score(ScoreConfig::for_symbol("NIFTY")))
        );
    }

    #[test]
    fn test_open_unknown_widget_fails() {
        let (state, mut settings, _) = setup();
        assert!(matches!(
            settings.open(&state, &WidgetId::from("ghost")),
            Err(DashboardError::WidgetNotFound(_))
        ));
        assert!(!settings.is_open());
    }
}
