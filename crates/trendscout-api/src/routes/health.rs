use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct RootResponse {
    status: &'static str,
    message: &'static str,
}

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/api/healthz", get(healthz))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "ok",
        message: "Trend Analysis API is running!",
    })
}

async fn healthz() -> &'static str {
    "ok"
}
