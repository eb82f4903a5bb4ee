use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{error, info};
use trendscout_core::{
    Config, DynReportStore, FileReportStore, Orchestrator, RunOutcome, StoredReport,
    model_from_config,
};

use crate::config::AppConfig;
use crate::error::AppError;

/// Result of a run that produced a report.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub run_id: String,
    pub report: serde_json::Value,
    pub json: String,
}

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    store: DynReportStore,
    run_permits: Arc<Semaphore>,
    api_key: Option<Arc<String>>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, store: DynReportStore, api_key: Option<String>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            store,
            run_permits: Arc::new(Semaphore::new(1)),
            api_key: api_key.map(Arc::new),
        }
    }

    /// Build the live pipeline from the pipeline config and the service settings.
    pub fn try_new(config: &Config, app_config: &AppConfig) -> anyhow::Result<Self> {
        let model = model_from_config(&config.llm)?;
        let orchestrator = Orchestrator::from_config(config, model)?;
        let store: DynReportStore = Arc::new(FileReportStore::new(config.storage.dir.clone()));
        Ok(Self::new(orchestrator, store, app_config.api_key.clone()))
    }

    pub fn api_key(&self) -> Option<Arc<String>> {
        self.api_key.clone()
    }

    pub fn store(&self) -> DynReportStore {
        self.store.clone()
    }

    /// Claim the single run slot, or `None` when a run is in progress.
    pub fn try_acquire_run(&self) -> Option<OwnedSemaphorePermit> {
        self.run_permits.clone().try_acquire_owned().ok()
    }

    /// Run the pipeline once on a worker task.
    ///
    /// The run continues even if the requesting client goes away. Aborted
    /// runs and pipeline errors both map to HTTP 500.
    pub async fn run_pipeline(&self) -> Result<CompletedRun, AppError> {
        let permit = self.try_acquire_run().ok_or_else(AppError::run_in_progress)?;

        let orchestrator = self.orchestrator.clone();
        let handle = tokio::spawn(async move {
            let outcome = orchestrator.run().await;
            drop(permit);
            outcome
        });

        let outcome = handle
            .await
            .map_err(|err| AppError::internal(format!("pipeline worker failed: {err}")))?
            .map_err(|err| {
                error!(error = %err, "pipeline run failed");
                AppError::from(err)
            })?;

        match outcome {
            RunOutcome::Completed {
                run_id,
                report,
                json,
                ..
            } => {
                info!(run_id = %run_id, "pipeline run completed");
                Ok(CompletedRun {
                    run_id,
                    report,
                    json,
                })
            }
            RunOutcome::Aborted {
                run_id,
                stage,
                reason,
                ..
            } => {
                error!(run_id = %run_id, stage = %stage, "pipeline run aborted");
                Err(AppError::internal(format!(
                    "run aborted during {stage}: {reason}"
                )))
            }
        }
    }

    /// Run the pipeline and keep the result as the latest report.
    pub async fn run_and_store(&self) -> Result<StoredReport, AppError> {
        let run = self.run_pipeline().await?;
        let stored = StoredReport {
            report: run.report,
            generated_at: Utc::now(),
            run_id: run.run_id,
        };
        self.store.save_latest(&stored).await?;
        Ok(stored)
    }
}
