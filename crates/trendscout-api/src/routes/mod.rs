mod analysis;
mod health;
mod trends;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub use analysis::{API_KEY_HEADER, Authorized};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::health_router())
        .merge(analysis::analysis_router())
        .merge(trends::trends_router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
