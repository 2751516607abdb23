//! Headless Trackk dashboard client.
//!
//! Ties the dashboard state to the live-data connection, keeps
//! subscriptions in step with the widget grid, and persists the workspace
//! between runs.

pub mod app;
pub mod config;
pub mod error;
pub mod interest;
pub mod workspace;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use interest::{InterestDiff, InterestReconciler};
pub use workspace::WorkspaceFile;
