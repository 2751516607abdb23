//! Main application orchestration.
//!
//! Wires the dashboard state to the live-data connection: every change to
//! the widget grid is followed by a reconcile pass that adjusts the
//! subscriptions, and routed messages land in the feed and watchlist book.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::interest::{InterestDiff, InterestReconciler};
use crate::workspace::WorkspaceFile;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use trackk_core::{LayoutId, PresetId, WidgetId, WidgetKind};
use trackk_dashboard::{
    DashboardState, LiveFeed, PresetEngine, UserPreferences, WatchlistBook,
    WidgetSettingsController,
};
use trackk_telemetry::Metrics;
use trackk_ws::{
    ConnectionManager, ConnectionState, ListenerHandle, MessageRouter, SubscriptionRegistry,
};

const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Headless dashboard client.
pub struct Application {
    config: AppConfig,
    connection: ConnectionManager,
    states: watch::Receiver<ConnectionState>,
    dashboard: Arc<RwLock<DashboardState>>,
    feed: Arc<RwLock<LiveFeed>>,
    watchlists: Arc<RwLock<WatchlistBook>>,
    presets: PresetEngine,
    settings: WidgetSettingsController,
    preferences: UserPreferences,
    interest: InterestReconciler,
    _listeners: Vec<ListenerHandle>,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let registry = Arc::new(SubscriptionRegistry::new());
        let router = MessageRouter::new();

        let feed = Arc::new(RwLock::new(LiveFeed::with_capacity(
            config.feed.series_capacity,
            config.feed.news_capacity,
        )));
        let watchlists = Arc::new(RwLock::new(WatchlistBook::new()));

        let listeners = vec![
            {
                let feed = feed.clone();
                router.on_message(move |message| {
                    feed.write().apply(message);
                    Ok(())
                })
            },
            {
                let watchlists = watchlists.clone();
                router.on_message(move |message| {
                    watchlists.write().apply(message);
                    Ok(())
                })
            },
        ];

        let connection =
            ConnectionManager::new(config.ws.connection.clone(), registry.clone(), router);
        let states = connection.state_changes();

        Ok(Self {
            connection,
            states,
            dashboard: Arc::new(RwLock::new(DashboardState::new())),
            feed,
            watchlists,
            presets: PresetEngine::new()?,
            settings: WidgetSettingsController::new(),
            preferences: UserPreferences::default(),
            interest: InterestReconciler::new(registry),
            _listeners: listeners,
            config,
        })
    }

    /// Restore the saved workspace, pick the starting widgets and connect.
    ///
    /// `preset` replaces whatever the workspace held. Without it, the
    /// configured default preset is applied only when the dashboard would
    /// otherwise start empty.
    pub async fn init(&mut self, preset: Option<&str>) -> AppResult<()> {
        let restored = self.load_workspace()?;

        match preset {
            Some(id) => {
                if !self.apply_preset(id) {
                    return Err(AppError::Config(format!("Unknown preset: {id}")));
                }
            }
            None if self.dashboard.read().widgets().is_empty() => {
                let id = self.config.default_preset.clone();
                if !self.apply_preset(&id) {
                    warn!(preset_id = %id, "Default preset not found, starting empty");
                }
            }
            None => {
                self.reconcile();
            }
        }

        info!(
            restored,
            widgets = self.dashboard.read().widgets().len(),
            symbols = self.connection.registry().len(),
            "Dashboard ready"
        );

        let token = self.config.token();
        self.connection.connect(token.as_deref()).await?;

        // Collection ops issued while detached were dropped.
        self.states.borrow_and_update();
        let collections = self.interest.resubscribe_collections();
        info!(url = %self.config.ws.connection.url, collections, "Live data connected");
        Ok(())
    }

    /// Run until Ctrl+C.
    pub async fn run(&mut self) -> AppResult<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
        })
        .await
    }

    /// Follow connection state changes until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        let mut states = self.states.clone();
        let mut status = tokio::time::interval(STATUS_INTERVAL);
        status.tick().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                changed = states.changed() => {
                    if changed.is_err() {
                        warn!("Connection state channel closed");
                        break;
                    }
                    let state = *states.borrow_and_update();
                    self.on_state_change(state);
                }
                _ = status.tick() => {
                    self.log_status();
                }
            }
        }

        self.states = states;
        Ok(())
    }

    /// Close the connection and persist the workspace.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        info!("Shutting down");
        self.connection.shutdown().await;
        self.interest.reset();
        self.write_metrics();
        self.persist()?;
        info!("Shutdown complete");
        Ok(())
    }

    fn on_state_change(&self, state: ConnectionState) {
        match state {
            ConnectionState::Open => {
                let collections = self.interest.resubscribe_collections();
                info!(collections, "Live data connected");
            }
            ConnectionState::Reconnecting => {
                warn!(
                    attempt = self.connection.reconnect_attempt(),
                    "Live data interrupted, reconnecting"
                );
            }
            ConnectionState::Disconnected => {
                error!("Live data disconnected; quotes are no longer updating");
            }
            ConnectionState::Connecting => debug!("Live data connecting"),
        }
    }

    fn log_status(&self) {
        info!(
            state = %self.connection.state(),
            widgets = self.dashboard.read().widgets().len(),
            subscriptions = self.connection.registry().len(),
            "Status"
        );
        self.write_metrics();
    }

    fn write_metrics(&self) {
        let Some(path) = &self.config.metrics_path else {
            return;
        };
        if let Err(e) = Metrics::write_textfile(path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics");
        }
    }

    // ------------------------------------------------------------------
    // Dashboard editing
    // ------------------------------------------------------------------

    /// Mutate the dashboard, then reconcile subscriptions.
    pub fn edit_dashboard<R>(&mut self, f: impl FnOnce(&mut DashboardState) -> R) -> R {
        let result = f(&mut self.dashboard.write());
        self.reconcile();
        result
    }

    /// Replace the dashboard with preset `id`. False if it does not exist.
    pub fn apply_preset(&mut self, id: &str) -> bool {
        let applied = self
            .presets
            .switch_to(&mut self.dashboard.write(), &PresetId::new(id));
        if applied {
            self.reconcile();
        }
        applied
    }

    /// Add a widget from the palette using the user's defaults for `kind`.
    pub fn add_palette_widget(&mut self, kind: WidgetKind) -> AppResult<WidgetId> {
        let widget = DashboardState::palette_widget_with(self.preferences.widget_config(kind))?;
        let id = widget.id.clone();
        self.edit_dashboard(|state| state.add_widget(widget));
        Ok(id)
    }

    pub fn remove_widget(&mut self, id: &WidgetId) -> bool {
        self.edit_dashboard(|state| state.remove_widget(id))
    }

    pub fn load_layout(&mut self, id: &LayoutId) -> bool {
        self.edit_dashboard(|state| state.load_layout(id))
    }

    /// Start editing a widget's settings.
    pub fn open_settings(&mut self, id: &WidgetId) -> AppResult<()> {
        self.settings.open(&self.dashboard.read(), id)?;
        Ok(())
    }

    pub fn settings_mut(&mut self) -> &mut WidgetSettingsController {
        &mut self.settings
    }

    /// Commit the settings buffer, then reconcile subscriptions.
    pub fn save_settings(&mut self) -> AppResult<()> {
        self.settings.save(&mut self.dashboard.write())?;
        self.reconcile();
        Ok(())
    }

    /// Bring subscriptions in line with the current widgets and drop feed
    /// data for symbols no widget shows.
    pub fn reconcile(&mut self) -> InterestDiff {
        let diff = self.interest.reconcile(self.dashboard.read().widgets());
        if !diff.unsubscribed.is_empty() {
            let symbols: Vec<String> = self.interest.symbols().map(str::to_string).collect();
            self.feed.write().retain_symbols(&symbols);
        }
        diff
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn load_workspace(&mut self) -> AppResult<bool> {
        let Some(workspace) = WorkspaceFile::load(&self.config.workspace_path)? else {
            return Ok(false);
        };
        workspace.restore_into(
            &mut self.dashboard.write(),
            &mut self.presets,
            &mut self.preferences,
            &mut self.watchlists.write(),
        );
        Ok(true)
    }

    /// Write the workspace file.
    pub fn persist(&self) -> AppResult<()> {
        WorkspaceFile::capture(
            &self.dashboard.read(),
            &self.presets,
            &self.preferences,
            &self.watchlists.read(),
        )
        .save(&self.config.workspace_path)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Shared handle to the dashboard. Edits made through it are not
    /// reconciled until the next [`Application::reconcile`].
    pub fn dashboard(&self) -> Arc<RwLock<DashboardState>> {
        self.dashboard.clone()
    }

    pub fn feed(&self) -> Arc<RwLock<LiveFeed>> {
        self.feed.clone()
    }

    pub fn watchlists(&self) -> Arc<RwLock<WatchlistBook>> {
        self.watchlists.clone()
    }

    pub fn presets(&self) -> &PresetEngine {
        &self.presets
    }

    pub fn presets_mut(&mut self) -> &mut PresetEngine {
        &mut self.presets
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut UserPreferences {
        &mut self.preferences
    }

    pub fn interest(&self) -> &InterestReconciler {
        &self.interest
    }
}
