use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};

use crate::error::AppError;
use crate::state::AppState;

pub fn trends_router() -> Router<AppState> {
    Router::new()
        .route("/trends", get(latest_trends))
        .route("/api/trends", get(latest_trends))
}

/// The trend document of the latest stored run.
async fn latest_trends(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    match state.store().load_latest().await? {
        Some(stored) => Ok((
            [(header::CACHE_CONTROL, "public, max-age=30")],
            Json(stored.report),
        )),
        None => Err(AppError::no_report()),
    }
}
