//! Sequential pipeline: three scouts, then either the multi-stage enrichment
//! (synthesis, per-trend startup finding, verification) or the single-shot
//! final report, then persistence.
//!
//! Stages never overlap. Each stage outcome is resolved from the agent's
//! [`FailurePolicy`] and recorded in the trace and stage metrics. Scout
//! failures only thin out the input of later stages; in the multi-stage path
//! a synthesis that does not parse is fatal and nothing is written.
//! Language-model transport errors propagate as `Err`.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::agents::{
    Agent, FailurePolicy, FinalReportAgent, Scout, ScoutKind, ScoutOutcome, ScoutSettings,
    StartupFinderAgent, Synthesis, SynthesisAgent, VerificationAgent, Verified,
};
use crate::config::{Config, PersonaConfig, PipelineVariant};
use crate::error::{Result, TrendScoutError};
use crate::llm::SharedModel;
use crate::metrics;
use crate::providers::{NewsClient, PreprintClient, RepositoryClient};
use crate::report::{StartupList, trend_name};
use crate::storage::write_report_file;
use crate::trace::StageTrace;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);
const ABORT_PREVIEW_CHARS: usize = 200;

pub type DynScout = Arc<dyn Agent<Input = String, Output = ScoutOutcome>>;
pub type DynSynthesis = Arc<dyn Agent<Input = Vec<String>, Output = Synthesis>>;
pub type DynStartupFinder = Arc<dyn Agent<Input = String, Output = String>>;
pub type DynVerifier = Arc<dyn Agent<Input = Map<String, Value>, Output = Verified>>;
pub type DynFinalReport = Arc<dyn Agent<Input = Vec<String>, Output = String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    NotStarted,
    ScoutingNews,
    ScoutingRepo,
    ScoutingPreprint,
    Synthesizing,
    Enriching { index: usize },
    Verifying,
    Reporting,
    Persisted,
    Aborted,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::NotStarted => "not_started",
            PipelineStage::ScoutingNews => "scouting_news",
            PipelineStage::ScoutingRepo => "scouting_repo",
            PipelineStage::ScoutingPreprint => "scouting_preprint",
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Enriching { .. } => "enriching",
            PipelineStage::Verifying => "verifying",
            PipelineStage::Reporting => "reporting",
            PipelineStage::Persisted => "persisted",
            PipelineStage::Aborted => "aborted",
        }
    }

    fn for_scout(kind: ScoutKind) -> Self {
        match kind {
            ScoutKind::News => PipelineStage::ScoutingNews,
            ScoutKind::Repository => PipelineStage::ScoutingRepo,
            ScoutKind::Preprint => PipelineStage::ScoutingPreprint,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Enriching { index } => write!(f, "enriching[{index}]"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// The three scouts, run in this order.
#[derive(Clone)]
pub struct ScoutSet {
    pub news: DynScout,
    pub repository: DynScout,
    pub preprint: DynScout,
}

/// What follows the scouts.
#[derive(Clone)]
pub enum Enrichment {
    MultiStage {
        synthesis: DynSynthesis,
        startup_finder: DynStartupFinder,
        verifier: DynVerifier,
    },
    FinalReport {
        agent: DynFinalReport,
    },
}

impl Enrichment {
    pub fn variant(&self) -> PipelineVariant {
        match self {
            Enrichment::MultiStage { .. } => PipelineVariant::MultiStage,
            Enrichment::FinalReport { .. } => PipelineVariant::FinalReport,
        }
    }

    /// Agents for `variant`, all sharing one model.
    pub fn for_variant(variant: PipelineVariant, model: SharedModel) -> Self {
        match variant {
            PipelineVariant::MultiStage => Enrichment::MultiStage {
                synthesis: Arc::new(SynthesisAgent::new(model.clone())),
                startup_finder: Arc::new(StartupFinderAgent::new(model.clone())),
                verifier: Arc::new(VerificationAgent::new(model)),
            },
            PipelineVariant::FinalReport => Enrichment::FinalReport {
                agent: Arc::new(FinalReportAgent::new(model)),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed {
        run_id: String,
        report: Value,
        /// `report` exactly as written to `output_path`.
        json: String,
        output_path: PathBuf,
        trace: StageTrace,
    },
    Aborted {
        run_id: String,
        stage: PipelineStage,
        reason: String,
        trace: StageTrace,
    },
}

impl RunOutcome {
    pub fn run_id(&self) -> &str {
        match self {
            RunOutcome::Completed { run_id, .. } | RunOutcome::Aborted { run_id, .. } => run_id,
        }
    }

    pub fn trace(&self) -> &StageTrace {
        match self {
            RunOutcome::Completed { trace, .. } | RunOutcome::Aborted { trace, .. } => trace,
        }
    }
}

pub struct Orchestrator {
    scouts: ScoutSet,
    enrichment: Enrichment,
    personas: PersonaConfig,
    output_path: PathBuf,
}

impl Orchestrator {
    pub fn new(
        scouts: ScoutSet,
        enrichment: Enrichment,
        personas: PersonaConfig,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scouts,
            enrichment,
            personas,
            output_path: output_path.into(),
        }
    }

    /// Wire the live provider clients and agents described by `config`.
    pub fn from_config(config: &Config, model: SharedModel) -> Result<Self> {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|err| {
                TrendScoutError::InvalidConfiguration(format!(
                    "failed to create HTTP client: {err}"
                ))
            })?;
        let pipeline = &config.pipeline;
        let providers = &config.providers;

        let scouts = ScoutSet {
            news: Arc::new(Scout::new(
                ScoutKind::News,
                model.clone(),
                NewsClient::new(client.clone(), providers.news.clone()),
                ScoutSettings::for_kind(ScoutKind::News, pipeline),
            )),
            repository: Arc::new(Scout::new(
                ScoutKind::Repository,
                model.clone(),
                RepositoryClient::new(client.clone(), providers.repository.clone()),
                ScoutSettings::for_kind(ScoutKind::Repository, pipeline),
            )),
            preprint: Arc::new(Scout::new(
                ScoutKind::Preprint,
                model.clone(),
                PreprintClient::new(client, providers.preprint.clone()),
                ScoutSettings::for_kind(ScoutKind::Preprint, pipeline),
            )),
        };

        Ok(Self::new(
            scouts,
            Enrichment::for_variant(pipeline.variant, model),
            config.personas.clone(),
            pipeline.output_path.clone(),
        ))
    }

    pub fn variant(&self) -> PipelineVariant {
        self.enrichment.variant()
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    /// Execute one full pipeline run.
    pub async fn run(&self) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "pipeline_run",
            run_id = %run_id,
            variant = self.variant().as_str()
        );
        self.run_stages(run_id).instrument(span).await
    }

    async fn run_stages(&self, run_id: String) -> Result<RunOutcome> {
        let started = Instant::now();
        let mut trace = StageTrace::new();
        trace.record(PipelineStage::NotStarted.to_string(), "run created");
        tracing::info!("starting trend discovery run");

        let reports = vec![
            self.scout(&self.scouts.news, &self.personas.investor, &mut trace)
                .await?,
            self.scout(
                &self.scouts.repository,
                &self.personas.technical_interest,
                &mut trace,
            )
            .await?,
            self.scout(&self.scouts.preprint, &self.personas.investor, &mut trace)
                .await?,
        ];

        let report = match &self.enrichment {
            Enrichment::MultiStage {
                synthesis,
                startup_finder,
                verifier,
            } => {
                let stage_started = Instant::now();
                let trends = match synthesis.execute(reports).await? {
                    Synthesis::Ranked { trends, .. } => {
                        finish_stage(
                            &mut trace,
                            PipelineStage::Synthesizing,
                            "ok",
                            format!("{} trends ranked", trends.len()),
                            stage_started,
                        );
                        trends
                    }
                    Synthesis::Unparsed(text) => {
                        let policy = unranked_synthesis_policy(synthesis.failure_policy());
                        if policy == FailurePolicy::Fatal {
                            let reason = format!(
                                "synthesis output is not valid JSON: {}",
                                preview(&text)
                            );
                            finish_stage(
                                &mut trace,
                                PipelineStage::Synthesizing,
                                policy.as_str(),
                                reason.clone(),
                                stage_started,
                            );
                            trace.record(
                                PipelineStage::Aborted.to_string(),
                                "nothing persisted",
                            );
                            tracing::error!(reason = %reason, "run aborted");
                            tracing::debug!(trace = %trace.render_markdown(), "stage trace");
                            return Ok(RunOutcome::Aborted {
                                run_id,
                                stage: PipelineStage::Synthesizing,
                                reason,
                                trace,
                            });
                        }
                        tracing::warn!(
                            policy = policy.as_str(),
                            "synthesis output unusable; continuing without trends"
                        );
                        finish_stage(
                            &mut trace,
                            PipelineStage::Synthesizing,
                            policy.as_str(),
                            "no trends ranked",
                            stage_started,
                        );
                        Vec::new()
                    }
                };

                let mut enriched = Vec::with_capacity(trends.len());
                for (index, trend) in trends.into_iter().enumerate() {
                    enriched.push(
                        self.enrich(startup_finder, index, trend, &mut trace)
                            .await?,
                    );
                }

                let mut assembled = Map::new();
                assembled.insert("trends".to_string(), Value::Array(enriched));

                let stage_started = Instant::now();
                let verified = verifier.execute(assembled).await?;
                let outcome = if verified.repaired {
                    verifier.failure_policy().as_str()
                } else {
                    "ok"
                };
                finish_stage(
                    &mut trace,
                    PipelineStage::Verifying,
                    outcome,
                    format!("confidence {}", verified.summary.confidence_score),
                    stage_started,
                );
                Value::Object(verified.document)
            }
            Enrichment::FinalReport { agent } => {
                let stage_started = Instant::now();
                let json = agent.execute(reports).await?;
                let document: Value = serde_json::from_str(&json)?;
                let count = document["trends"].as_array().map_or(0, Vec::len);
                finish_stage(
                    &mut trace,
                    PipelineStage::Reporting,
                    "ok",
                    format!("{count} trends in report"),
                    stage_started,
                );
                document
            }
        };

        let json = serde_json::to_string_pretty(&report)?;
        write_report_file(&self.output_path, &json).await?;
        trace.record(
            PipelineStage::Persisted.to_string(),
            format!("written to {}", self.output_path.display()),
        );
        tracing::info!(
            path = %self.output_path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run complete"
        );
        tracing::debug!(trace = %trace.render_markdown(), "stage trace");

        Ok(RunOutcome::Completed {
            run_id,
            report,
            json,
            output_path: self.output_path.clone(),
            trace,
        })
    }

    async fn scout(&self, scout: &DynScout, seed: &str, trace: &mut StageTrace) -> Result<String> {
        let started = Instant::now();
        let outcome = match scout.execute(seed.to_string()).await {
            Ok(outcome) => outcome,
            Err(err) => {
                metrics::record_stage(scout.name(), "error", elapsed_ms(started));
                return Err(err);
            }
        };
        let status = if outcome.is_degraded() {
            scout.failure_policy().as_str()
        } else {
            "ok"
        };
        finish_stage(
            trace,
            PipelineStage::for_scout(outcome.kind),
            status,
            scout.name(),
            started,
        );
        Ok(outcome.report)
    }

    /// Attach startups to one ranked trend. Trends without a usable name are
    /// copied unchanged.
    async fn enrich(
        &self,
        finder: &DynStartupFinder,
        index: usize,
        mut trend: Value,
        trace: &mut StageTrace,
    ) -> Result<Value> {
        let started = Instant::now();
        let stage = PipelineStage::Enriching { index };
        let Some(name) = trend_name(&trend) else {
            tracing::warn!(index, "trend has no name; skipping enrichment");
            finish_stage(trace, stage, "skipped", "no trend name", started);
            return Ok(trend);
        };

        let json = finder.execute(name.clone()).await?;
        let list: StartupList = serde_json::from_str(&json)?;
        let found = list.startups.len();
        if let Some(object) = trend.as_object_mut() {
            object.insert(
                "startups".to_string(),
                serde_json::to_value(list.startups)?,
            );
        }
        finish_stage(
            trace,
            stage,
            "ok",
            format!("{found} startups for {name}"),
            started,
        );
        Ok(trend)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn finish_stage(
    trace: &mut StageTrace,
    stage: PipelineStage,
    outcome: &str,
    message: impl Into<String>,
    started: Instant,
) {
    let duration_ms = elapsed_ms(started);
    metrics::record_stage(stage.as_str(), outcome, duration_ms);
    tracing::info!(stage = %stage, outcome, duration_ms, "stage finished");
    trace.record(stage.to_string(), format!("[{outcome}] {}", message.into()));
}

/// Policy applied when synthesis yields no ranked trends. Raw text cannot be
/// enriched per trend, so passthrough ends the run.
fn unranked_synthesis_policy(agent_policy: FailurePolicy) -> FailurePolicy {
    match agent_policy {
        FailurePolicy::RawPassthrough => FailurePolicy::Fatal,
        other => other,
    }
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(ABORT_PREVIEW_CHARS).collect();
    if text.chars().count() > ABORT_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
