use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::runtime::Runtime;
use tracing::{info, warn};
use trendscout_core::{
    Config, ConfigLoader, Orchestrator, PipelineVariant, RunOutcome, TelemetryOptions,
    init_telemetry, model_from_config,
};

#[derive(Parser, Debug)]
#[command(
    name = "trendscout",
    version,
    about = "Scout news, repositories and preprints for emerging investment trends"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline once and print the final report.
    Run(RunArgs),
    /// Print the resolved configuration and any missing credentials.
    CheckConfig(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to a TOML config file (defaults to $TRENDSCOUT_CONFIG, then ./config.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Enrichment path to run after the scouts.
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Where to write the final report (overrides `pipeline.output_path`).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the stage trace after the report.
    #[arg(long, default_value_t = false)]
    trace: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VariantArg {
    MultiStage,
    FinalReport,
}

impl From<VariantArg> for PipelineVariant {
    fn from(value: VariantArg) -> Self {
        match value {
            VariantArg::MultiStage => PipelineVariant::MultiStage,
            VariantArg::FinalReport => PipelineVariant::FinalReport,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let rt = Runtime::new()?;
    rt.block_on(async move {
        match cli.command {
            Command::Run(args) => run_command(args).await?,
            Command::CheckConfig(args) => check_config_command(args)?,
        }
        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config = ConfigLoader::load(path)?;
    init_telemetry(TelemetryOptions::default().with_level(config.logging.level.clone()))?;
    Ok(config)
}

fn credential_banner(missing: &[String]) -> String {
    let rule = "=".repeat(60);
    format!(
        "\n{rule}\n!!! PREREQUISITE ERROR !!!\nSet the following environment variables before running:\n  {}\n{rule}",
        missing.join("\n  ")
    )
}

async fn run_command(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.config)?;
    if let Some(variant) = args.variant {
        config.pipeline.variant = variant.into();
    }
    if let Some(output) = args.output {
        config.pipeline.output_path = output;
    }

    let missing = config.missing_credentials();
    if !missing.is_empty() {
        eprintln!("{}", credential_banner(&missing));
        bail!("missing credentials: {}", missing.join(", "));
    }

    info!(
        variant = config.pipeline.variant.as_str(),
        model = %config.llm.model,
        "starting trend discovery"
    );

    let model = model_from_config(&config.llm)?;
    let orchestrator = Orchestrator::from_config(&config, model)?;
    info!(
        output = %orchestrator.output_path().display(),
        "pipeline ready"
    );

    match orchestrator.run().await? {
        RunOutcome::Completed {
            json,
            output_path,
            trace,
            ..
        } => {
            println!("{json}");
            info!(path = %output_path.display(), "final report saved");
            if args.trace {
                println!("\n{}", trace.render_markdown());
            }
            Ok(())
        }
        RunOutcome::Aborted {
            run_id,
            stage,
            reason,
            trace,
        } => {
            warn!(run_id = %run_id, stage = %stage, "run aborted; no report written");
            if args.trace {
                eprintln!("{}", trace.render_markdown());
            }
            bail!("run aborted during {stage}: {reason}")
        }
    }
}

fn check_config_command(args: ConfigArgs) -> Result<()> {
    let config = load_config(args.config)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    let missing = config.missing_credentials();
    if missing.is_empty() {
        println!("\nAll credentials present.");
    } else {
        println!("{}", credential_banner(&missing));
    }
    Ok(())
}
