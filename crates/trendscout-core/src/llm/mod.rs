//! Text-completion primitive shared by every agent.
//!
//! Agents only ever see [`LanguageModel`]; the concrete model is chosen once
//! at start-up from [`crate::config::LlmConfig`] and handed to each agent.

mod gemini;
mod scripted;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{LlmError, TrendScoutError};

pub use gemini::GeminiModel;
pub use scripted::ScriptedModel;

/// Fixed sampling parameters applied to every completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        LlmConfig::default().generation()
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier used in logs.
    fn name(&self) -> &str;

    /// Complete a single prompt and return the raw text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

pub type SharedModel = Arc<dyn LanguageModel>;

/// Build the model named by `config.provider`.
pub fn model_from_config(config: &LlmConfig) -> Result<SharedModel, TrendScoutError> {
    match config.provider.trim().to_ascii_lowercase().as_str() {
        "gemini" => Ok(Arc::new(GeminiModel::from_config(config)?)),
        other => Err(TrendScoutError::InvalidConfiguration(format!(
            "unsupported llm.provider `{other}` (expected `gemini`)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".into(),
            ..LlmConfig::default()
        };
        let err = model_from_config(&config).err().expect("provider should be rejected");
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
