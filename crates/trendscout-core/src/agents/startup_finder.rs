use async_trait::async_trait;
use serde_json::Value;

use super::{Agent, FailurePolicy, complete_or_empty, strip_code_fences};
use crate::error::Result;
use crate::llm::SharedModel;
use crate::report::{EMPTY_STARTUPS_JSON, validate_startup_list};

/// Names early-stage startups working on one trend, from model knowledge only.
pub struct StartupFinderAgent {
    model: SharedModel,
}

impl StartupFinderAgent {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }

    fn prompt(trend_name: &str) -> String {
        format!(
            "You are a venture capital associate specializing in deep tech. Identify promising, \
real-world, early-stage (Seed or Series A) startups operating within a specific technological trend.\n\n\
Technological Trend: \"{trend_name}\"\n\n\
Instructions:\n\
1. Search your knowledge base for 2-4 companies that are clear leaders or innovative players in this exact space.\n\
2. For each company, provide its name, a one-sentence summary of what it does, and a brief rationale \
for why it fits this trend.\n\
3. If you cannot find any real companies, return an empty list. Do not invent companies.\n\
4. Return a JSON object with a single key \"startups\", a list of objects with the keys \
\"name\" (string), \"summary\" (string), and \"rationale\" (string).\n\n\
Example Output Format:\n\
{{\n  \"startups\": [\n    {{\n      \"name\": \"ExampleTech Inc.\",\n      \
\"summary\": \"Develops a novel platform for AI-driven material discovery.\",\n      \
\"rationale\": \"Directly applies the trend to solve a major R&D problem in manufacturing.\"\n    }}\n  ]\n}}\n\n\
Now, produce the JSON object for the specified trend."
        )
    }
}

#[async_trait]
impl Agent for StartupFinderAgent {
    type Input = String;
    /// `{"startups": [...]}` with only complete entries.
    type Output = String;

    fn name(&self) -> &'static str {
        "startup_finder"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::SilentDegrade
    }

    async fn execute(&self, trend_name: String) -> Result<String> {
        let raw = complete_or_empty(&self.model, &Self::prompt(&trend_name)).await?;
        let cleaned = strip_code_fences(&raw);

        let validated = serde_json::from_str::<Value>(&cleaned)
            .ok()
            .and_then(|document| validate_startup_list(&document));
        let Some(validated) = validated else {
            tracing::warn!(trend = %trend_name, "startup list is not valid JSON; using empty list");
            return Ok(EMPTY_STARTUPS_JSON.to_string());
        };

        if validated.discarded > 0 {
            tracing::warn!(
                trend = %trend_name,
                discarded = validated.discarded,
                "dropped incomplete startup entries"
            );
        }
        tracing::info!(
            trend = %trend_name,
            startups = validated.value.startups.len(),
            "startups found"
        );
        Ok(serde_json::to_string_pretty(&validated.value)?)
    }
}
