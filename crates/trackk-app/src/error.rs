//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<trackk_ws::WsError>),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] trackk_dashboard::DashboardError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] trackk_telemetry::TelemetryError),

    #[error("Workspace file error: {0}")]
    Workspace(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<trackk_ws::WsError> for AppError {
    fn from(e: trackk_ws::WsError) -> Self {
        Self::WebSocket(Box::new(e))
    }
}

impl From<trackk_core::CoreError> for AppError {
    fn from(e: trackk_core::CoreError) -> Self {
        Self::Dashboard(e.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
