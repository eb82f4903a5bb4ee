use std::path::PathBuf;

use thiserror::Error;

/// Core error type for TrendScout.
#[derive(Debug, Error)]
pub enum TrendScoutError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("llm call failed: {0}")]
    Llm(#[from] LlmError),
    #[error("failed to write report to {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrendScoutError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }

    pub fn storage(path: PathBuf, source: std::io::Error) -> Self {
        Self::Storage { path, source }
    }
}

/// Failure of a single completion request.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing LLM credential: {0}")]
    MissingCredential(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no text")]
    EmptyResponse,
    #[error("completion blocked: {0}")]
    Blocked(String),
}

/// Failure of a single provider query. Never fatal to a scout.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing provider credential: {0}")]
    MissingCredential(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode provider response: {0}")]
    Decode(String),
    #[error("invalid provider query: {0}")]
    InvalidQuery(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ProviderError::Decode(error.to_string())
        } else {
            ProviderError::Request(error.to_string())
        }
    }
}

pub type Result<T, E = TrendScoutError> = std::result::Result<T, E>;
