//! Scouts turn a persona into provider queries, collect records, and ask the
//! model for a free-text trend narrative.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Agent, FailurePolicy, complete_or_empty, parse_query_list};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::llm::SharedModel;
use crate::metrics;
use crate::providers::{RecordSet, SignalSource};
use crate::redact::redact_secrets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoutKind {
    News,
    Repository,
    Preprint,
}

impl ScoutKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoutKind::News => "news",
            ScoutKind::Repository => "repository",
            ScoutKind::Preprint => "preprint",
        }
    }

    /// Report returned when the model produced no usable queries.
    pub fn no_strategy_report(self) -> &'static str {
        match self {
            ScoutKind::News => "No news signals found: failed to generate search strategy.",
            ScoutKind::Repository => "No GitHub trends found: failed to generate search strategy.",
            ScoutKind::Preprint => "No research trends found: failed to generate search strategy.",
        }
    }

    /// Report returned when every query came back empty or failed.
    pub fn no_signals_report(self) -> &'static str {
        match self {
            ScoutKind::News => "No news signals found: API returned no articles.",
            ScoutKind::Repository => "No emerging GitHub repositories found.",
            ScoutKind::Preprint => "No research trends found: API returned no papers.",
        }
    }

    fn strategy_prompt(self, seed: &str) -> String {
        match self {
            ScoutKind::News => format!(
                "Based on this VC Persona, generate 4 diverse, high-level news queries to scan \
for early signals of technological and economic shifts.\n\
Make each query precise and use boolean operators (AND, OR) to find high-signal results.\n\n\
VC Persona: \"{seed}\"\n\n\
Return only the 4 search queries, one per line."
            ),
            ScoutKind::Repository => format!(
                "For the broad technical area of \"{seed}\", generate 5 specific and technical \
search queries for the GitHub repository search API.\n\
Focus on nascent technologies, new libraries, or emerging architectural patterns.\n\n\
Return only the 5 queries, one per line."
            ),
            ScoutKind::Preprint => format!(
                "Based on this VC Persona, generate a research discovery strategy with 5 diverse \
arXiv search queries (using categories like 'cat:cs.AI' or keywords).\n\
The goal is to find early, fundamental research signals that could lead to future startups.\n\n\
VC Persona: \"{seed}\"\n\n\
Return only the 5 search queries, one per line."
            ),
        }
    }

    fn analysis_prompt(self, seed: &str, records: &str) -> String {
        match self {
            ScoutKind::News => format!(
                "As a VC analyst with this persona: \"{seed}\", analyze the following news headlines.\n\
Identify the top 2-3 most promising, under-the-radar, and investable trends.\n\
For each trend, briefly describe the signal and its VC angle.\n\n\
Headlines:\n{records}"
            ),
            ScoutKind::Repository => format!(
                "As a principal engineer interested in \"{seed}\", analyze this list of new GitHub repositories.\n\
Identify the top 2-3 most significant technical trends.\n\
A trend is a pattern of multiple new tools being created to solve a similar new problem.\n\
For each trend, describe the signal and why it is gaining traction now.\n\n\
Repository Data:\n{records}"
            ),
            ScoutKind::Preprint => format!(
                "As a deep-tech VC analyst with this persona: \"{seed}\", analyze the titles of the \
following recent research papers from arXiv.\n\
Identify the top 2-3 most compelling, granular, and specific emerging patterns that could \
become major investment opportunities.\n\
Ignore well-known trends. Focus on what is truly new and foundational. For each, describe \
the research signal and its potential commercial application.\n\n\
Research Papers Data (Title and Date):\n{records}"
            ),
        }
    }
}

/// Per-scout limits taken from `[pipeline]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoutSettings {
    /// Only the first `n` generated queries are sent to the provider.
    pub query_limit: Option<usize>,
    /// Upper bound on records serialised into the analysis prompt.
    pub max_records: usize,
    /// Pause between successive provider calls.
    pub request_delay: Duration,
}

impl ScoutSettings {
    pub fn for_kind(kind: ScoutKind, pipeline: &PipelineConfig) -> Self {
        let query_limit = match kind {
            ScoutKind::News => pipeline.news_query_limit,
            ScoutKind::Repository => pipeline.repository_query_limit,
            ScoutKind::Preprint => pipeline.preprint_query_limit,
        };
        Self {
            query_limit,
            max_records: pipeline.max_records,
            request_delay: pipeline.request_delay(),
        }
    }
}

impl Default for ScoutSettings {
    fn default() -> Self {
        Self {
            query_limit: None,
            max_records: 300,
            request_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoutStatus {
    Completed { queries: usize, records: usize },
    NoStrategy,
    NoSignals,
}

/// A scout's trend narrative plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutOutcome {
    pub kind: ScoutKind,
    pub status: ScoutStatus,
    pub report: String,
}

impl ScoutOutcome {
    pub fn is_degraded(&self) -> bool {
        !matches!(self.status, ScoutStatus::Completed { .. })
    }
}

pub struct Scout<S> {
    kind: ScoutKind,
    model: SharedModel,
    source: S,
    settings: ScoutSettings,
}

impl<S: SignalSource> Scout<S> {
    pub fn new(kind: ScoutKind, model: SharedModel, source: S, settings: ScoutSettings) -> Self {
        Self {
            kind,
            model,
            source,
            settings,
        }
    }

    async fn strategize(&self, seed: &str) -> Result<Vec<String>> {
        let text = complete_or_empty(&self.model, &self.kind.strategy_prompt(seed)).await?;
        Ok(parse_query_list(&text))
    }

    async fn collect(&self, queries: &[String]) -> RecordSet<S::Record> {
        let mut records = RecordSet::new();
        for (index, query) in queries.iter().enumerate() {
            if index > 0 && !self.settings.request_delay.is_zero() {
                tokio::time::sleep(self.settings.request_delay).await;
            }

            match self.source.search(query).await {
                Ok(batch) => {
                    metrics::record_provider_request(self.source.name(), true);
                    tracing::debug!(
                        scout = self.kind.as_str(),
                        query = %query,
                        records = batch.len(),
                        "provider query returned"
                    );
                    for record in batch {
                        records.insert(S::record_key(&record), record);
                    }
                }
                Err(err) => {
                    metrics::record_provider_request(self.source.name(), false);
                    tracing::warn!(
                        scout = self.kind.as_str(),
                        query = %redact_secrets(query),
                        error = %redact_secrets(&err.to_string()),
                        "provider query failed; skipping"
                    );
                }
            }
        }
        records
    }

    fn degraded(&self, status: ScoutStatus) -> ScoutOutcome {
        let report = match status {
            ScoutStatus::NoStrategy => self.kind.no_strategy_report(),
            _ => self.kind.no_signals_report(),
        };
        ScoutOutcome {
            kind: self.kind,
            status,
            report: report.to_string(),
        }
    }
}

#[async_trait]
impl<S: SignalSource> Agent for Scout<S> {
    type Input = String;
    type Output = ScoutOutcome;

    fn name(&self) -> &'static str {
        match self.kind {
            ScoutKind::News => "news_scout",
            ScoutKind::Repository => "repository_scout",
            ScoutKind::Preprint => "preprint_scout",
        }
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::SilentDegrade
    }

    async fn execute(&self, seed: String) -> Result<ScoutOutcome> {
        let started = Instant::now();
        tracing::info!(scout = self.kind.as_str(), "scout starting");

        let mut queries = self.strategize(&seed).await?;
        if queries.is_empty() {
            tracing::warn!(scout = self.kind.as_str(), "no search strategy generated");
            return Ok(self.degraded(ScoutStatus::NoStrategy));
        }
        if let Some(limit) = self.settings.query_limit {
            queries.truncate(limit);
        }
        tracing::info!(scout = self.kind.as_str(), queries = queries.len(), "executing strategy");

        let records = self.collect(&queries).await;
        if records.is_empty() {
            tracing::warn!(scout = self.kind.as_str(), "no records collected");
            return Ok(self.degraded(ScoutStatus::NoSignals));
        }

        let collected = records.len();
        let bounded: Vec<&S::Record> = records.iter().take(self.settings.max_records).collect();
        let payload = serde_json::to_string_pretty(&bounded)?;
        let report = self
            .model
            .complete(&self.kind.analysis_prompt(&seed, &payload))
            .await?;

        tracing::info!(
            scout = self.kind.as_str(),
            queries = queries.len(),
            records = collected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scout complete"
        );

        Ok(ScoutOutcome {
            kind: self.kind,
            status: ScoutStatus::Completed {
                queries: queries.len(),
                records: collected,
            },
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::ProviderError;
    use crate::llm::ScriptedModel;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Item {
        id: String,
        stars: u32,
    }

    /// Provider with canned results per query; unknown queries fail.
    #[derive(Default)]
    struct StubSource {
        results: HashMap<String, Vec<Item>>,
        seen: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn with(mut self, query: &str, items: Vec<Item>) -> Self {
            self.results.insert(query.to_string(), items);
            self
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SignalSource for StubSource {
        type Record = Item;

        fn name(&self) -> &'static str {
            "stub"
        }

        async fn search(&self, query: &str) -> std::result::Result<Vec<Item>, ProviderError> {
            self.seen.lock().unwrap().push(query.to_string());
            self.results.get(query).cloned().ok_or_else(|| ProviderError::Status {
                status: 500,
                body: "apiKey=leaked-secret".into(),
            })
        }

        fn record_key(record: &Item) -> Option<String> {
            Some(record.id.clone())
        }
    }

    fn item(id: &str, stars: u32) -> Item {
        Item {
            id: id.to_string(),
            stars,
        }
    }

    fn fast(query_limit: Option<usize>) -> ScoutSettings {
        ScoutSettings {
            query_limit,
            max_records: 300,
            request_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn blank_strategy_returns_sentinel_without_provider_calls() {
        let model = Arc::new(ScriptedModel::with_responses(["\n   \n\t\n"]));
        let source = StubSource::default();
        let scout = Scout::new(ScoutKind::Preprint, model.clone(), source, fast(None));

        let outcome = scout.execute("persona".into()).await.unwrap();
        assert_eq!(outcome.status, ScoutStatus::NoStrategy);
        assert_eq!(
            outcome.report,
            "No research trends found: failed to generate search strategy."
        );
        assert!(scout.source.seen().is_empty());
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn failed_queries_are_skipped_and_duplicates_collapse() {
        let model = Arc::new(ScriptedModel::with_responses([
            "agents\nbroken\nrag",
            "Trend narrative",
        ]));
        let source = StubSource::default()
            .with("agents", vec![item("org/a", 10), item("org/b", 3)])
            .with("rag", vec![item("org/a", 99)]);
        let scout = Scout::new(ScoutKind::Repository, model.clone(), source, fast(None));

        let outcome = scout.execute("AI agents".into()).await.unwrap();
        assert_eq!(outcome.report, "Trend narrative");
        assert_eq!(
            outcome.status,
            ScoutStatus::Completed {
                queries: 3,
                records: 2
            }
        );
        assert_eq!(scout.source.seen(), vec!["agents", "broken", "rag"]);

        let analysis = &model.prompts()[1];
        assert!(analysis.contains("AI agents"));
        assert!(analysis.contains("\"stars\": 99"));
        assert!(!analysis.contains("\"stars\": 10"));
    }

    #[tokio::test]
    async fn query_limit_caps_provider_calls() {
        let model = Arc::new(ScriptedModel::with_responses(["q1\nq2\nq3\nq4\nq5", "report"]));
        let source = StubSource::default()
            .with("q1", vec![item("p1", 1)])
            .with("q2", vec![])
            .with("q3", vec![])
            .with("q4", vec![]);
        let scout = Scout::new(ScoutKind::Preprint, model, source, fast(Some(4)));

        scout.execute("persona".into()).await.unwrap();
        assert_eq!(scout.source.seen(), vec!["q1", "q2", "q3", "q4"]);
    }

    #[tokio::test]
    async fn no_records_returns_sentinel_without_analysis() {
        let model = Arc::new(ScriptedModel::with_responses(["only-query"]));
        let source = StubSource::default().with("only-query", vec![]);
        let scout = Scout::new(ScoutKind::News, model.clone(), source, fast(None));

        let outcome = scout.execute("persona".into()).await.unwrap();
        assert_eq!(outcome.status, ScoutStatus::NoSignals);
        assert_eq!(outcome.report, "No news signals found: API returned no articles.");
        assert!(outcome.is_degraded());
        assert_eq!(model.remaining(), 0);
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn record_payload_is_bounded() {
        let model = Arc::new(ScriptedModel::with_responses(["q", "report"]));
        let items = (0..5).map(|i| item(&format!("r{i}"), i)).collect();
        let source = StubSource::default().with("q", items);
        let settings = ScoutSettings {
            max_records: 2,
            ..fast(None)
        };
        let scout = Scout::new(ScoutKind::Repository, model.clone(), source, settings);

        scout.execute("area".into()).await.unwrap();
        let analysis = &model.prompts()[1];
        assert!(analysis.contains("\"r1\""));
        assert!(!analysis.contains("\"r2\""));
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_provider_calls() {
        let model = Arc::new(ScriptedModel::with_responses(["a\nb\nc", "report"]));
        let source = StubSource::default()
            .with("a", vec![item("x", 1)])
            .with("b", vec![])
            .with("c", vec![]);
        let settings = ScoutSettings {
            request_delay: Duration::from_millis(1000),
            ..fast(None)
        };
        let scout = Scout::new(ScoutKind::Repository, model, source, settings);

        let started = tokio::time::Instant::now();
        scout.execute("area".into()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }

    #[test]
    fn settings_follow_pipeline_limits() {
        let pipeline = PipelineConfig::default();
        assert_eq!(
            ScoutSettings::for_kind(ScoutKind::Preprint, &pipeline).query_limit,
            Some(4)
        );
        assert_eq!(
            ScoutSettings::for_kind(ScoutKind::News, &pipeline).query_limit,
            None
        );
    }
}
