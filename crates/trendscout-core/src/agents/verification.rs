use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Agent, FailurePolicy, complete_or_empty, strip_code_fences};
use crate::error::Result;
use crate::llm::SharedModel;
use crate::report::VerificationSummary;

pub const SUMMARY_KEY: &str = "verification_summary";

/// Report with the verification summary attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Verified {
    pub document: Map<String, Value>,
    pub summary: VerificationSummary,
    /// `true` when the summary was built locally because the model output was unusable.
    pub repaired: bool,
}

impl Verified {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }
}

/// Red-team review of the assembled report.
///
/// The model is asked to return the whole report with a summary added. Only
/// the summary is taken from its answer; it is inserted into the caller's
/// report so nothing else can change.
pub struct VerificationAgent {
    model: SharedModel,
}

impl VerificationAgent {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }

    fn prompt(report: &str) -> String {
        format!(
            "You are a skeptical, highly experienced senior partner at a top-tier venture capital firm. \
You are reviewing a trend report compiled by your junior analysts. Perform a final \"red team\" review \
for logical consistency, accuracy, and potential blind spots before it is presented to the investment committee.\n\n\
Here is the report you need to review:\n---\n{report}\n---\n\n\
Instructions:\n\
1. Critically assess the entire report. Are the connections between the trends and the listed startups logical?\n\
2. Is the investment thesis for each trend well-supported by the implied raw signals?\n\
3. Identify any hype, buzzwords, or areas where the analysis might be too optimistic.\n\
4. Create a \"verification_summary\" object containing:\n\
   - `confidence_score`: your confidence in the report's overall quality and accuracy, an integer from 1 (low) to 10 (high).\n\
   - `assessment`: a 2-4 sentence summary of your review, covering strengths and weaknesses.\n\
   - `potential_blind_spots`: a list of 2-3 critical questions or risks the analysts may have overlooked.\n\n\
Your final output must be the original JSON report with your new `verification_summary` object \
added as a top-level key. Do not modify any other part of the original report."
        )
    }

    fn extract_summary(cleaned: &str) -> Option<(VerificationSummary, Value)> {
        let parsed: Value = serde_json::from_str(cleaned).ok()?;
        let summary = VerificationSummary::from_value(parsed.get(SUMMARY_KEY)?)?;
        Some((summary, parsed))
    }
}

fn altered_content(original: &Map<String, Value>, returned: &Value) -> bool {
    let Some(returned) = returned.as_object() else {
        return true;
    };
    let mut returned = returned.clone();
    returned.remove(SUMMARY_KEY);
    &returned != original
}

#[async_trait]
impl Agent for VerificationAgent {
    type Input = Map<String, Value>;
    type Output = Verified;

    fn name(&self) -> &'static str {
        "verification"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::LocallyRepaired
    }

    async fn execute(&self, report: Map<String, Value>) -> Result<Verified> {
        let rendered = serde_json::to_string_pretty(&report)?;
        let raw = complete_or_empty(&self.model, &Self::prompt(&rendered)).await?;
        let cleaned = strip_code_fences(&raw);

        let (summary, repaired) = match Self::extract_summary(&cleaned) {
            Some((summary, returned)) => {
                if altered_content(&report, &returned) {
                    tracing::warn!("verifier altered report content; keeping the original");
                }
                (summary, false)
            }
            None => {
                tracing::warn!("verification output unusable; attaching local summary");
                (VerificationSummary::format_failure(cleaned), true)
            }
        };

        tracing::info!(
            confidence = summary.confidence_score,
            repaired,
            "verification complete"
        );

        let mut document = report;
        document.insert(SUMMARY_KEY.to_string(), serde_json::to_value(&summary)?);
        Ok(Verified {
            document,
            summary,
            repaired,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::llm::ScriptedModel;

    fn report() -> Map<String, Value> {
        let value = json!({
            "trends": [
                {"rank": 1, "trend_name": "Edge Inference", "investment_thesis": "t", "startups": []}
            ],
            "generated_by": "multi_stage"
        });
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn malformed_output_is_repaired_locally() {
        let model = Arc::new(ScriptedModel::with_responses(["Looks good to me!"]));
        let agent = VerificationAgent::new(model);
        let input = report();

        let verified = agent.execute(input.clone()).await.unwrap();
        assert!(verified.repaired);
        for (key, value) in &input {
            assert_eq!(verified.document.get(key), Some(value));
        }
        let summary = &verified.document[SUMMARY_KEY];
        assert_eq!(summary["assessment"], VerificationSummary::FORMAT_FAILURE);
        assert_eq!(summary["confidence_score"], 1);
        assert_eq!(summary["raw_output"], "Looks good to me!");
    }

    #[tokio::test]
    async fn summary_is_taken_but_content_kept() {
        let answer = json!({
            "trends": [{"rank": 1, "trend_name": "Rewritten by the model"}],
            "verification_summary": {
                "confidence_score": 6,
                "assessment": "Plausible but thin on evidence.",
                "potential_blind_spots": ["Regulatory risk", "Incumbent response"]
            }
        });
        let model = Arc::new(ScriptedModel::with_responses([format!("```json\n{answer}\n```")]));
        let agent = VerificationAgent::new(model);
        let input = report();

        let verified = agent.execute(input.clone()).await.unwrap();
        assert!(!verified.repaired);
        assert_eq!(verified.summary.confidence_score, 6);
        assert_eq!(verified.document["trends"], input["trends"]);
        assert_eq!(
            verified.document.keys().collect::<Vec<_>>(),
            vec!["trends", "generated_by", SUMMARY_KEY]
        );
        assert!(verified.document[SUMMARY_KEY].get("raw_output").is_none());
    }

    #[tokio::test]
    async fn out_of_range_score_counts_as_format_failure() {
        let answer = json!({
            "trends": [],
            "verification_summary": {"confidence_score": 42, "assessment": "Great", "potential_blind_spots": []}
        });
        let model = Arc::new(ScriptedModel::with_responses([answer.to_string()]));
        let agent = VerificationAgent::new(model);

        let verified = agent.execute(report()).await.unwrap();
        assert!(verified.repaired);
        assert_eq!(verified.summary.assessment, VerificationSummary::FORMAT_FAILURE);
    }

    #[test]
    fn detects_altered_content() {
        let original = report();
        let mut same = Value::Object(original.clone());
        same[SUMMARY_KEY] = json!({"confidence_score": 5});
        assert!(!altered_content(&original, &same));
        assert!(altered_content(&original, &json!({"trends": []})));
    }

    #[tokio::test]
    async fn empty_completion_is_repaired_locally() {
        let agent = VerificationAgent::new(Arc::new(ScriptedModel::new()));
        let input = report();

        let verified = agent.execute(input.clone()).await.unwrap();
        assert!(verified.repaired);
        assert_eq!(verified.summary, VerificationSummary::format_failure(""));
        assert_eq!(verified.document["trends"], input["trends"]);
    }
}
