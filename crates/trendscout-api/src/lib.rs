//! HTTP shim around the TrendScout pipeline.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::AppError;
pub use routes::build_router;
pub use state::{AppState, CompletedRun};
