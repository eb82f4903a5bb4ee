use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt};

use crate::TrendScoutError;

static TELEMETRY_GUARD: OnceLock<()> = OnceLock::new();

/// Configuration options when initialising telemetry.
#[derive(Debug, Clone)]
pub struct TelemetryOptions {
    /// Filter used when `RUST_LOG` is unset, usually `logging.level`.
    pub default_filter: String,
    pub with_ansi: bool,
    pub with_target: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            with_ansi: true,
            with_target: false,
        }
    }
}

impl TelemetryOptions {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.default_filter = level.into();
        self
    }
}

/// Initialise the global tracing subscriber.
///
/// Safe to call multiple times; only the first invocation installs the subscriber.
pub fn init_telemetry(options: TelemetryOptions) -> Result<(), TrendScoutError> {
    if TELEMETRY_GUARD.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_ansi(options.with_ansi)
        .with_target(options.with_target)
        .try_init()
        .map_err(|err| {
            TrendScoutError::InvalidConfiguration(format!("telemetry init failed: {err}"))
        })?;

    TELEMETRY_GUARD.get_or_init(|| ());
    Ok(())
}
