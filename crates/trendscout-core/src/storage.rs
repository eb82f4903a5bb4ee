//! Report persistence: the pipeline output file and the "latest" slot.
//!
//! Both are single documents that are overwritten on every write. Writes go
//! to a sibling temporary file first and are then renamed into place, so a
//! reader never sees a half-written report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TrendScoutError};

const LATEST_FILE: &str = "latest.json";

/// The most recent report together with when and by which run it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub report: Value,
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save_latest(&self, report: &StoredReport) -> Result<()>;

    async fn load_latest(&self) -> Result<Option<StoredReport>>;
}

pub type DynReportStore = Arc<dyn ReportStore>;

/// Keeps the latest report as `{dir}/latest.json`.
#[derive(Debug, Clone)]
pub struct FileReportStore {
    dir: PathBuf,
}

impl FileReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_FILE)
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn save_latest(&self, report: &StoredReport) -> Result<()> {
        let payload = serde_json::to_string_pretty(report)?;
        write_report_file(&self.latest_path(), &payload).await
    }

    async fn load_latest(&self) -> Result<Option<StoredReport>> {
        let path = self.latest_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(TrendScoutError::storage(path, err)),
        }
    }
}

/// Overwrite `path` with `contents`, creating parent directories as needed.
pub async fn write_report_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| TrendScoutError::storage(parent.to_path_buf(), err))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, contents)
        .await
        .map_err(|err| TrendScoutError::storage(temp_path.clone(), err))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|err| TrendScoutError::storage(path.to_path_buf(), err))?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "report written");
    Ok(())
}
