use async_trait::async_trait;
use serde_json::Value;

use super::{Agent, FailurePolicy, REPORT_SEPARATOR, strip_code_fences};
use crate::error::Result;
use crate::llm::SharedModel;
use crate::report::{EMPTY_TRENDS_JSON, validate_final_report};

/// Single-shot synthesis producing the nested trend document directly.
pub struct FinalReportAgent {
    model: SharedModel,
}

impl FinalReportAgent {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }

    fn prompt(reports: &[String]) -> String {
        let combined = reports.join(REPORT_SEPARATOR);
        format!(
            "You are a world-class venture capital strategist responsible for creating the final \
investment report. You have received raw intelligence from your market news, open-source, and \
academic research divisions.\n\n\
Synthesize all of it into a single, cohesive, deeply nested JSON object that follows the exact \
schema required by our web application.\n\n\
JSON SCHEMA REQUIREMENTS:\n\
The output MUST be a JSON object with a single top-level key: \"trends\", a list of Trend objects.\n\
A Trend object has:\n\
- `id`: a unique, URL-friendly string (e.g. \"generative-physical-ai\").\n\
- `name`: a short, descriptive name.\n\
- `description`: a 2-3 sentence summary of the trend's investment thesis.\n\
- `importance`: an integer from 1 to 10 for its disruptive potential.\n\
- `subtrends`: a list of Subtrend objects.\n\
A Subtrend object has:\n\
- `id`: a unique, URL-friendly string.\n\
- `name`: a short, descriptive name.\n\
- `description`: a 1-2 sentence summary of this niche.\n\
- `startups`: a list of real-world, early-stage Startup objects in this niche.\n\
A Startup object has:\n\
- `name`: the official name of the startup.\n\
- `summary`: a one-sentence description of what it does.\n\
- `rationale`: why it is a key player in this subtrend.\n\n\
YOUR TASK:\n\
1. Analyze all the raw intelligence below.\n\
2. Identify the top 2-3 most powerful meta-trends in the combined data.\n\
3. For each meta-trend, identify 2-3 specific subtrends or niches.\n\
4. For each subtrend, name 2-3 real, early-stage startups from your knowledge base.\n\
5. Build the JSON object strictly following the schema. Add no commentary outside the JSON.\n\n\
RAW INTELLIGENCE REPORTS:\n---\n{combined}\n---\n\n\
Now, produce ONLY the final JSON object."
        )
    }
}

#[async_trait]
impl Agent for FinalReportAgent {
    type Input = Vec<String>;
    type Output = String;

    fn name(&self) -> &'static str {
        "final_report"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::SilentDegrade
    }

    async fn execute(&self, reports: Vec<String>) -> Result<String> {
        tracing::info!(reports = reports.len(), "building final report");
        let raw = self.model.complete(&Self::prompt(&reports)).await?;
        let cleaned = strip_code_fences(&raw);

        let validated = serde_json::from_str::<Value>(&cleaned)
            .ok()
            .and_then(|document| validate_final_report(&document));
        let Some(validated) = validated else {
            tracing::error!("final report is not valid JSON; returning empty trend list");
            return Ok(EMPTY_TRENDS_JSON.to_string());
        };

        if validated.discarded > 0 {
            tracing::warn!(
                discarded = validated.discarded,
                "dropped invalid trend, subtrend or startup entries"
            );
        }
        tracing::info!(trends = validated.value.trends.len(), "final report generated");
        Ok(serde_json::to_string_pretty(&validated.value)?)
    }
}
