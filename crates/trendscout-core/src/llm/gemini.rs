use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationSettings, LanguageModel};
use crate::config::LlmConfig;
use crate::error::{LlmError, TrendScoutError};
use crate::redact::redact_secrets;
use crate::security::lookup_env;

/// Gemini `generateContent` over plain HTTPS.
///
/// The API key is looked up on every call, so a process can start without it
/// and fail only the requests that need it.
pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
    api_key_env: String,
    generation: GenerationSettings,
}

impl GeminiModel {
    pub fn from_config(config: &LlmConfig) -> Result<Self, TrendScoutError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| {
                TrendScoutError::InvalidConfiguration(format!(
                    "failed to create HTTP client: {err}"
                ))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            generation: config.generation(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.generation.temperature,
                top_p: self.generation.top_p,
                max_output_tokens: self.generation.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = lookup_env(&self.api_key_env)
            .ok_or_else(|| LlmError::MissingCredential(self.api_key_env.clone()))?;

        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose())
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|err| LlmError::Request(redact_secrets(&err.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: redact_secrets(&body),
            });
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|err| LlmError::Request(format!("invalid response body: {err}")))?;

        payload.into_text()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, LlmError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::Blocked(reason));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            Err(LlmError::EmptyResponse)
        } else {
            Ok(text)
        }
    }
}
