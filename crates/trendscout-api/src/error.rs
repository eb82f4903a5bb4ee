use std::fmt;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use trendscout_core::TrendScoutError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(error: impl ToString) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    /// Rejection for a missing or mismatched `X-API-KEY`.
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Could not validate credentials")
    }

    pub fn run_in_progress() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "a pipeline run is already in progress",
        )
    }

    pub fn no_report() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "no trend report has been generated yet",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let payload = ErrorResponse {
            error: self.message,
        };
        (self.status, Json(payload)).into_response()
    }
}

impl From<TrendScoutError> for AppError {
    fn from(error: TrendScoutError) -> Self {
        Self::internal(error)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_server_error() {
        let err = AppError::from(TrendScoutError::InvalidConfiguration("bad".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn named_rejections_carry_their_status() {
        assert_eq!(AppError::forbidden().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::run_in_progress().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(AppError::no_report().status(), StatusCode::NOT_FOUND);
    }
}
