//! TrendScout core: scouts, enrichment agents and the pipeline orchestrator.
//!
//! A run asks three scouts (news, repositories, preprints) for free-text trend
//! narratives, turns them into a structured trend report with one of two
//! enrichment paths, and persists the result.

pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod orchestrator;
pub mod providers;
pub mod redact;
pub mod report;
pub mod security;
pub mod storage;
pub mod telemetry;
pub mod trace;

pub use agents::{
    Agent, FailurePolicy, FinalReportAgent, Scout, ScoutKind, ScoutOutcome, ScoutSettings,
    ScoutStatus, StartupFinderAgent, Synthesis, SynthesisAgent, VerificationAgent, Verified,
    parse_query_list, strip_code_fences,
};
pub use config::{Config, ConfigLoader, PipelineVariant};
pub use error::{LlmError, ProviderError, Result, TrendScoutError};
pub use llm::{LanguageModel, ScriptedModel, SharedModel, model_from_config};
pub use orchestrator::{Enrichment, Orchestrator, PipelineStage, RunOutcome, ScoutSet};
pub use report::{FinalReport, Startup, StartupList, Subtrend, Trend, VerificationSummary};
pub use security::{SecretValue, require_env};
pub use storage::{DynReportStore, FileReportStore, ReportStore, StoredReport};
pub use telemetry::{TelemetryOptions, init_telemetry};
pub use trace::{StageTrace, TraceEvent};
