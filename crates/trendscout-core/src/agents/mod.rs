//! Pipeline agents.
//!
//! Every agent is a single async function over plain values: a persona or a
//! list of reports in, a report string or typed document out. What an agent
//! does when the model's output is unusable is fixed per agent and exposed as
//! its [`FailurePolicy`] so the orchestrator can branch on it explicitly.

mod final_report;
mod scout;
mod startup_finder;
mod synthesis;
mod verification;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::llm::SharedModel;

pub use final_report::FinalReportAgent;
pub use scout::{Scout, ScoutKind, ScoutOutcome, ScoutSettings, ScoutStatus};
pub use startup_finder::StartupFinderAgent;
pub use synthesis::{Synthesis, SynthesisAgent};
pub use verification::{Verified, VerificationAgent};

/// Separator placed between scout reports when they are combined in a prompt.
pub const REPORT_SEPARATOR: &str = "\n\n---\n\n";

/// What an agent returns when the model output cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The run cannot continue.
    Fatal,
    /// A canonical empty value replaces the output.
    SilentDegrade,
    /// The cleaned raw text is handed back unchanged.
    RawPassthrough,
    /// A well-formed result is built locally and flagged.
    LocallyRepaired,
}

impl FailurePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            FailurePolicy::Fatal => "fatal",
            FailurePolicy::SilentDegrade => "silent_degrade",
            FailurePolicy::RawPassthrough => "raw_passthrough",
            FailurePolicy::LocallyRepaired => "locally_repaired",
        }
    }
}

/// Trait for agent implementations.
///
/// Only transport failures of the language model surface as `Err`; malformed
/// model output is handled inside `execute` according to
/// [`Agent::failure_policy`].
#[async_trait]
pub trait Agent: Send + Sync {
    type Input: Send;
    type Output: Send;

    fn name(&self) -> &'static str;

    fn failure_policy(&self) -> FailurePolicy;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output>;
}

/// Model text for `prompt`, reading an empty completion as empty text so the
/// caller's own fallback applies. Other model errors propagate.
pub(crate) async fn complete_or_empty(model: &SharedModel, prompt: &str) -> Result<String> {
    match model.complete(prompt).await {
        Ok(text) => Ok(text),
        Err(LlmError::EmptyResponse) => {
            tracing::warn!("model returned no text");
            Ok(String::new())
        }
        Err(err) => Err(err.into()),
    }
}

/// Remove Markdown code fences the model tends to wrap JSON in.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// One query per non-blank line, trimmed.
pub fn parse_query_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_list_has_no_blank_entries() {
        let raw = "\n  \"solid-state battery\" AND startup  \n\n\t\nCRISPR OR \"base editing\"\r\n   \n";
        let queries = parse_query_list(raw);
        assert_eq!(
            queries,
            vec![
                "\"solid-state battery\" AND startup".to_string(),
                "CRISPR OR \"base editing\"".to_string()
            ]
        );
        assert!(queries.iter().all(|q| !q.trim().is_empty()));
    }

    #[test]
    fn query_list_of_whitespace_is_empty() {
        assert!(parse_query_list("   \n\n \t ").is_empty());
        assert!(parse_query_list("").is_empty());
    }

    #[test]
    fn strips_fences_around_json() {
        let fenced = "  ```json\n{\"top_trends\": []}\n```  ";
        assert_eq!(strip_code_fences(fenced), "{\"top_trends\": []}");
    }

    #[test]
    fn stripping_is_idempotent() {
        let fenced = "```\n{\"a\": 1}\n```";
        let once = strip_code_fences(fenced);
        assert_eq!(strip_code_fences(&once), once);
    }
}
