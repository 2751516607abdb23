//! Dashboard error types.

use thiserror::Error;
use trackk_core::{CoreError, WidgetId};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Invalid widget data: {0}")]
    Core(#[from] CoreError),

    #[error("Widget settings are not open")]
    SettingsClosed,

    #[error("Widget not found: {0}")]
    WidgetNotFound(WidgetId),
}

pub type DashboardResult<T> = Result<T, DashboardError>;
