//! Error types for trackk-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid grid position: {0}")]
    InvalidPosition(String),

    #[error("Invalid {kind} widget config: {reason}")]
    InvalidConfig { kind: &'static str, reason: String },

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
