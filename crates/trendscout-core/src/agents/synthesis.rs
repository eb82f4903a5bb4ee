use async_trait::async_trait;
use serde_json::Value;

use super::{Agent, FailurePolicy, REPORT_SEPARATOR, strip_code_fences};
use crate::error::Result;
use crate::llm::SharedModel;
use crate::report::RankedTrend;

/// Result of merging the scout reports.
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesis {
    /// Parsed `{"top_trends": [...]}`, re-serialised, plus the raw trend objects.
    Ranked { json: String, trends: Vec<Value> },
    /// The cleaned model output when it was not a ranked-trend document.
    Unparsed(String),
}

/// Finds cross-report meta-trends and ranks them.
pub struct SynthesisAgent {
    model: SharedModel,
}

impl SynthesisAgent {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }

    fn prompt(reports: &[String]) -> String {
        let combined = reports.join(REPORT_SEPARATOR);
        format!(
            "You are a world-class venture capital strategist. You have received raw intelligence \
reports from three different divisions: Market News, Open-Source Technology, and Academic Research.\n\n\
Synthesize these reports into a single, cohesive, and actionable investment thesis. Identify the \
most powerful \"meta-trends\" that emerge when you connect the dots between the reports.\n\n\
RULES:\n\
1. Do not summarize each report. Find the intersections and reinforcing patterns between them.\n\
2. Filter out noise and weak signals. Focus on the 2-3 most dominant and commercially viable trends.\n\
3. For each meta-trend, provide a clear and compelling investment thesis.\n\
4. Rank the trends from most to least important by their potential for disruption and venture-scale returns.\n\
5. Return a JSON object with a single key \"top_trends\", a list of objects with the keys \
\"rank\" (integer), \"trend_name\" (string), and \"investment_thesis\" (string, 2-3 sentences).\n\n\
Raw intelligence reports:\n---\n{combined}\n---\n\n\
Now, produce the final synthesized JSON object."
        )
    }
}

/// Parse cleaned model output into a ranked synthesis.
fn parse_ranked(cleaned: &str) -> Option<Synthesis> {
    let parsed: Value = serde_json::from_str(cleaned).ok()?;
    let trends = parsed.get("top_trends")?.as_array()?.clone();
    let json = serde_json::to_string_pretty(&parsed).ok()?;
    Some(Synthesis::Ranked { json, trends })
}

#[async_trait]
impl Agent for SynthesisAgent {
    type Input = Vec<String>;
    type Output = Synthesis;

    fn name(&self) -> &'static str {
        "synthesis"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::RawPassthrough
    }

    async fn execute(&self, reports: Vec<String>) -> Result<Synthesis> {
        tracing::info!(reports = reports.len(), "synthesizing scout reports");
        let raw = self.model.complete(&Self::prompt(&reports)).await?;
        let cleaned = strip_code_fences(&raw);

        match parse_ranked(&cleaned) {
            Some(synthesis) => {
                if let Synthesis::Ranked { trends, .. } = &synthesis {
                    let names: Vec<String> = trends
                        .iter()
                        .filter_map(|trend| RankedTrend::from_value(trend).trend_name)
                        .collect();
                    tracing::info!(trends = trends.len(), names = ?names, "synthesis complete");
                }
                Ok(synthesis)
            }
            None => {
                tracing::warn!(
                    chars = cleaned.len(),
                    "synthesis output is not a ranked-trend document; returning raw text"
                );
                Ok(Synthesis::Unparsed(cleaned))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::ScriptedModel;

    const RANKED: &str = r#"{"top_trends":[{"rank":1,"trend_name":"Programmable Biology","investment_thesis":"Cheap synthesis meets ML design."}]}"#;

    #[tokio::test]
    async fn fenced_json_is_parsed_and_reserialised() {
        let model = Arc::new(ScriptedModel::with_responses([format!("```json\n{RANKED}\n```")]));
        let agent = SynthesisAgent::new(model);

        let synthesis = agent.execute(vec!["A".into(), "B".into()]).await.unwrap();
        let expected = serde_json::to_string_pretty(
            &serde_json::from_str::<Value>(RANKED).unwrap(),
        )
        .unwrap();
        match synthesis {
            Synthesis::Ranked { json, trends } => {
                assert_eq!(json, expected);
                assert_eq!(trends.len(), 1);
                assert_eq!(trends[0]["trend_name"], "Programmable Biology");
            }
            other => panic!("expected ranked synthesis, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_output_passes_through_cleaned() {
        let model = Arc::new(ScriptedModel::with_responses(["```json\nThe trends are: AI, bio\n```"]));
        let agent = SynthesisAgent::new(model);

        let synthesis = agent.execute(vec!["A".into()]).await.unwrap();
        assert_eq!(
            synthesis,
            Synthesis::Unparsed("The trends are: AI, bio".into())
        );
        assert_eq!(agent.failure_policy(), FailurePolicy::RawPassthrough);
    }

    #[tokio::test]
    async fn json_without_trend_list_is_unparsed() {
        let model = Arc::new(ScriptedModel::with_responses([r#"{"top_trends": "none"}"#]));
        let agent = SynthesisAgent::new(model);

        let synthesis = agent.execute(vec!["A".into()]).await.unwrap();
        assert!(matches!(synthesis, Synthesis::Unparsed(_)));
    }

    #[tokio::test]
    async fn reports_are_joined_with_separator() {
        let model = Arc::new(ScriptedModel::with_responses([RANKED]));
        let agent = SynthesisAgent::new(model.clone());

        agent
            .execute(vec!["Report A".into(), "Report B".into()])
            .await
            .unwrap();
        assert!(model.prompts()[0].contains("Report A\n\n---\n\nReport B"));
    }
}
