use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::FromRequestParts,
    http::request::Parts,
    routing::post,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub report: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduledRunResponse {
    pub status: &'static str,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub trend_count: usize,
}

pub fn analysis_router() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/run-scheduled-analysis", post(run_scheduled_analysis))
}

#[instrument(skip_all)]
async fn analyze(Authorized(state): Authorized) -> Result<Json<AnalyzeResponse>, AppError> {
    info!("analysis requested");
    let run = state.run_pipeline().await?;
    Ok(Json(AnalyzeResponse { report: run.json }))
}

#[instrument(skip_all)]
async fn run_scheduled_analysis(
    Authorized(state): Authorized,
) -> Result<Json<ScheduledRunResponse>, AppError> {
    info!("scheduled analysis requested");
    let stored = state.run_and_store().await?;
    let trend_count = stored.report["trends"].as_array().map_or(0, Vec::len);

    Ok(Json(ScheduledRunResponse {
        status: "success",
        run_id: stored.run_id,
        generated_at: stored.generated_at,
        trend_count,
    }))
}

/// State extractor that only succeeds when `X-API-KEY` matches the configured key.
pub struct Authorized(pub AppState);

#[async_trait]
impl FromRequestParts<AppState> for Authorized {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        match (state.api_key(), provided) {
            (Some(expected), Some(key)) if key == expected.as_str() => {
                Ok(Authorized(state.clone()))
            }
            _ => Err(AppError::forbidden()),
        }
    }
}
