use std::{
    env, fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::TrendScoutError;
use crate::llm::GenerationSettings;
use crate::security::require_env;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "TRENDSCOUT_CONFIG";

const DEFAULT_INVESTOR_PERSONA: &str = "Early-stage, deep-tech venture capital firm. We invest in foundational technologies \
that can create new markets or radically disrupt existing ones. We are comfortable \
with technical risk and long development cycles. We look for defensible 'moats' \
built on novel science or engineering. We are particularly interested in the \
intersections of software (AI/ML), biology, and advanced materials.";

const DEFAULT_TECHNICAL_INTEREST: &str =
    "The emerging stack for building and deploying autonomous AI Agents";

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub personas: PersonaConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Every credential environment variable that is currently unset.
    pub fn missing_credentials(&self) -> Vec<String> {
        [
            &self.llm.api_key_env,
            &self.providers.news.api_key_env,
            &self.providers.repository.token_env,
        ]
        .into_iter()
        .filter(|var| require_env(var).is_err())
        .cloned()
        .collect()
    }
}

/// Loads and validates [`Config`] from TOML.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument.
    /// 2. `TRENDSCOUT_CONFIG` environment variable.
    /// 3. `config.toml` in the current working directory, or built-in
    ///    defaults when that file does not exist.
    pub fn load(path: Option<PathBuf>) -> Result<Config, TrendScoutError> {
        let config = match resolve_path(path) {
            Some(candidate) => Self::from_file(&candidate)?,
            None => Config::default(),
        };

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config, TrendScoutError> {
        let raw = fs::read_to_string(path)
            .map_err(|err| TrendScoutError::config_io(path.to_path_buf(), err))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Config, TrendScoutError> {
        let config: Config = toml::from_str(raw)
            .map_err(|err| TrendScoutError::InvalidConfiguration(err.to_string()))?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &Config) -> Result<(), TrendScoutError> {
        if config.llm.api_key_env.trim().is_empty() {
            return Err(TrendScoutError::InvalidConfiguration(
                "llm.api_key_env must reference an environment variable".into(),
            ));
        }
        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(TrendScoutError::InvalidConfiguration(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                config.llm.temperature
            )));
        }
        if !(0.0..=1.0).contains(&config.llm.top_p) {
            return Err(TrendScoutError::InvalidConfiguration(format!(
                "llm.top_p must be within 0.0..=1.0, got {}",
                config.llm.top_p
            )));
        }
        let providers = &config.providers;
        check_range(
            "providers.repository.lookback_days",
            providers.repository.lookback_days,
            1..=3650,
        )?;
        check_range(
            "providers.repository.per_page",
            providers.repository.per_page,
            1..=100,
        )?;
        check_range("providers.news.page_size", providers.news.page_size, 1..=100)?;
        check_range(
            "providers.preprint.max_results",
            providers.preprint.max_results,
            1..=2000,
        )?;
        if config.pipeline.max_records == 0 {
            return Err(TrendScoutError::InvalidConfiguration(
                "pipeline.max_records must be greater than zero".into(),
            ));
        }
        if config.personas.investor.trim().is_empty()
            || config.personas.technical_interest.trim().is_empty()
        {
            return Err(TrendScoutError::InvalidConfiguration(
                "personas must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn check_range<T>(key: &str, value: T, range: RangeInclusive<T>) -> Result<(), TrendScoutError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        return Ok(());
    }
    Err(TrendScoutError::InvalidConfiguration(format!(
        "{key} must be within {}..={}, got {value}",
        range.start(),
        range.end()
    )))
}

fn resolve_path(path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path);
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV) {
        if !from_env.trim().is_empty() {
            return Some(PathBuf::from(from_env));
        }
    }

    let default = Path::new(DEFAULT_CONFIG_PATH);
    default.exists().then(|| default.to_path_buf())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn generation(&self) -> GenerationSettings {
        GenerationSettings {
            temperature: self.temperature,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            model: "gemini-2.5-pro".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            temperature: 0.6,
            top_p: 0.95,
            max_output_tokens: 8192,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Investor viewpoint steering the news and preprint scouts.
    pub investor: String,
    /// Technical area steering the repository scout.
    pub technical_interest: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            investor: DEFAULT_INVESTOR_PERSONA.into(),
            technical_interest: DEFAULT_TECHNICAL_INTEREST.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub preprint: PreprintConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub page_size: u32,
    pub language: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key_env: "NEWS_API_KEY".into(),
            base_url: "https://newsapi.org".into(),
            page_size: 50,
            language: "en".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub token_env: String,
    pub base_url: String,
    pub lookback_days: i64,
    pub min_stars: u32,
    pub per_page: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            token_env: "GITHUB_TOKEN".into(),
            base_url: "https://api.github.com".into(),
            lookback_days: 90,
            min_stars: 20,
            per_page: 25,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PreprintConfig {
    pub base_url: String,
    pub max_results: u32,
}

impl Default for PreprintConfig {
    fn default() -> Self {
        Self {
            base_url: "http://export.arxiv.org".into(),
            max_results: 150,
        }
    }
}

/// Which enrichment path follows the scouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVariant {
    /// Synthesis, per-trend startup finding, then verification.
    #[default]
    MultiStage,
    /// A single final-report call producing the nested trend document.
    FinalReport,
}

impl PipelineVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineVariant::MultiStage => "multi_stage",
            PipelineVariant::FinalReport => "final_report",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub variant: PipelineVariant,
    pub output_path: PathBuf,
    pub request_delay_ms: u64,
    pub max_records: usize,
    pub news_query_limit: Option<usize>,
    pub repository_query_limit: Option<usize>,
    pub preprint_query_limit: Option<usize>,
}

impl PipelineConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            variant: PipelineVariant::MultiStage,
            output_path: PathBuf::from("final_verified_trends_report.json"),
            request_delay_ms: 1000,
            max_records: 300,
            news_query_limit: None,
            repository_query_limit: None,
            preprint_query_limit: Some(4),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/reports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
