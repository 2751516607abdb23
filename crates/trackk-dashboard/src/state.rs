//! Live dashboard composition: widgets on the grid plus saved layouts.
//!
//! All operations are synchronous and take `&mut self`; the owner decides how
//! the state is shared. Unknown widget or layout ids are no-ops, never errors.

use indexmap::IndexSet;
use tracing::{debug, warn};
use trackk_core::{
    DataDependencies, GridPosition, Layout, LayoutId, Result, Widget, WidgetConfig, WidgetId,
    WidgetKind, WidgetPatch,
};

/// Side length of a widget added from the palette.
const PALETTE_SPAN: u32 = 4;

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    widgets: Vec<Widget>,
    layouts: Vec<Layout>,
    current_layout: Option<LayoutId>,
    is_dragging: bool,
    expanded: Option<WidgetId>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Widgets
    // ------------------------------------------------------------------

    /// Append a widget.
    ///
    /// Ids are the caller's responsibility. A duplicate id is logged but not
    /// rejected; lookups then resolve to the first match.
    pub fn add_widget(&mut self, widget: Widget) {
        if self.widget(&widget.id).is_some() {
            warn!(widget_id = %widget.id, "Adding widget with duplicate id");
        }
        debug!(widget_id = %widget.id, kind = %widget.kind(), "Widget added");
        self.widgets.push(widget);
    }

    /// Remove every widget with `id`. Returns whether anything was removed.
    pub fn remove_widget(&mut self, id: &WidgetId) -> bool {
        let before = self.widgets.len();
        self.widgets.retain(|w| &w.id != id);
        if self.expanded.as_ref() == Some(id) {
            self.expanded = None;
        }
        self.widgets.len() != before
    }

    /// Shallow-merge `patch` into the widget with `id`.
    ///
    /// Each field present in the patch replaces the widget's field as a
    /// whole; `config` is not merged key by key.
    pub fn update_widget(&mut self, id: &WidgetId, patch: WidgetPatch) -> bool {
        let mut found = false;
        for widget in self.widgets.iter_mut().filter(|w| &w.id == id) {
            patch.clone().apply_to(widget);
            found = true;
        }
        if !found {
            debug!(widget_id = %id, "update_widget: no such widget");
        }
        found
    }

    /// Move or resize a widget. Config and pin state are untouched.
    pub fn update_widget_position(&mut self, id: &WidgetId, position: GridPosition) -> bool {
        self.update_widget(id, WidgetPatch::new().with_position(position))
    }

    /// Replace the whole widget collection at once.
    pub fn replace_widgets(&mut self, widgets: Vec<Widget>) {
        self.widgets = widgets;
        if let Some(id) = &self.expanded {
            if self.widget(id).is_none() {
                self.expanded = None;
            }
        }
    }

    /// A default-configured widget of `kind` at the top-left corner, sized
    /// 4x4, with a fresh id. Not added to the grid.
    pub fn palette_widget(kind: WidgetKind) -> Result<Widget> {
        Self::palette_widget_with(WidgetConfig::default_for(kind))
    }

    /// Palette widget with a caller-supplied starting config.
    pub fn palette_widget_with(config: WidgetConfig) -> Result<Widget> {
        let position = GridPosition::new(0, 0, PALETTE_SPAN, PALETTE_SPAN)?;
        Widget::new(WidgetId::generate(), position, config)
    }

    pub fn widget(&self, id: &WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|w| &w.id == id)
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Live data keys declared by all widgets, deduplicated, first-seen order.
    pub fn dependencies(&self) -> DataDependencies {
        let mut symbols = IndexSet::new();
        let mut collections = IndexSet::new();
        for deps in self.widgets.iter().map(Widget::dependencies) {
            symbols.extend(deps.symbols);
            collections.extend(deps.collections);
        }
        DataDependencies {
            symbols: symbols.into_iter().collect(),
            collections: collections.into_iter().collect(),
        }
    }

    // ------------------------------------------------------------------
    // Layouts
    // ------------------------------------------------------------------

    /// Snapshot the current widgets into a new layout and make it current.
    pub fn save_layout(&mut self, name: impl Into<String>) -> LayoutId {
        let layout = Layout::snapshot(name, &self.widgets);
        let id = layout.id.clone();
        debug!(layout_id = %id, name = %layout.name, widgets = layout.widgets.len(), "Layout saved");
        self.layouts.push(layout);
        self.current_layout = Some(id.clone());
        id
    }

    /// Replace the live widgets with a copy of the layout's snapshot.
    pub fn load_layout(&mut self, id: &LayoutId) -> bool {
        let Some(layout) = self.layouts.iter().find(|l| &l.id == id) else {
            debug!(layout_id = %id, "load_layout: no such layout");
            return false;
        };
        let widgets = layout.widgets.clone();
        self.current_layout = Some(id.clone());
        self.replace_widgets(widgets);
        true
    }

    /// Same as [`DashboardState::load_layout`].
    pub fn set_current_layout(&mut self, id: &LayoutId) -> bool {
        self.load_layout(id)
    }

    pub fn current_layout(&self) -> Option<&Layout> {
        let id = self.current_layout.as_ref()?;
        self.layouts.iter().find(|l| &l.id == id)
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn find_layout_by_name(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.name == name)
    }

    /// Restore saved layouts (e.g. from a workspace file). Does not touch
    /// the live widgets.
    pub fn restore_layouts(&mut self, layouts: Vec<Layout>, current: Option<LayoutId>) {
        self.current_layout = current.filter(|id| layouts.iter().any(|l| &l.id == id));
        self.layouts = layouts;
    }

    // ------------------------------------------------------------------
    // Interaction flags
    // ------------------------------------------------------------------

    pub fn set_dragging(&mut self, dragging: bool) {
        self.is_dragging = dragging;
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    /// Show one widget full-size. Replaces any previously expanded widget.
    pub fn expand_widget(&mut self, id: &WidgetId) -> bool {
        if self.widget(id).is_none() {
            return false;
        }
        self.expanded = Some(id.clone());
        true
    }

    pub fn collapse_widget(&mut self) {
        self.expanded = None;
    }

    pub fn is_expanded(&self, id: &WidgetId) -> bool {
        self.expanded.as_ref() == Some(id)
    }

    pub fn expanded_widget(&self) -> Option<&WidgetId> {
        self.expanded.as_ref()
    }
}
