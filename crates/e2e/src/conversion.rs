//! Direct conversion through the API: submit, poll, download, record

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{E2eError, E2eResult};
use flowlab_common::{
    ConversionClient, ConvertOptions, Direction, JobOutcome, JobStatus, LabConfig, LabLayout, Tier,
};

/// Status of one conversion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Pending,
    Success,
    Failed,
    Error,
    Timeout,
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConversionStatus::Pending => "pending",
            ConversionStatus::Success => "success",
            ConversionStatus::Failed => "failed",
            ConversionStatus::Error => "error",
            ConversionStatus::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Record of one conversion attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub test_id: String,
    pub source_platform: String,
    pub target_platform: String,
    pub source_file: PathBuf,
    pub timestamp: DateTime<Local>,
    pub status: ConversionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionRecord {
    fn new(test_id: &str, direction: Direction, source_file: &Path) -> Self {
        Self {
            test_id: test_id.to_string(),
            source_platform: direction.source.api_name().to_string(),
            target_platform: direction.target.api_name().to_string(),
            source_file: source_file.to_path_buf(),
            timestamp: Local::now(),
            status: ConversionStatus::Pending,
            job_id: None,
            job_status: None,
            output_file: None,
            error: None,
        }
    }
}

/// Outcome of a whole session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub results_file: PathBuf,
    pub records: Vec<ConversionRecord>,
    pub counts: BTreeMap<ConversionStatus, usize>,
}

/// Conversion session against the API
#[derive(Debug, Clone)]
pub struct ConversionSession {
    client: ConversionClient,
    layout: LabLayout,
    options: ConvertOptions,
    job_timeout: Duration,
    poll_interval: Duration,
}

impl ConversionSession {
    pub fn new(client: ConversionClient, layout: LabLayout) -> Self {
        Self {
            client,
            layout,
            options: ConvertOptions::default(),
            job_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(5),
        }
    }

    pub fn from_config(config: &LabConfig) -> E2eResult<Self> {
        let client = ConversionClient::new(&config.api)?;
        Ok(Self::new(client, config.layout())
            .with_options(ConvertOptions::from(&config.api))
            .with_polling(
                Duration::from_secs(config.api.job_timeout_secs),
                Duration::from_secs(config.api.poll_interval_secs),
            ))
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_polling(mut self, timeout: Duration, interval: Duration) -> Self {
        self.job_timeout = timeout;
        self.poll_interval = interval;
        self
    }

    pub fn layout(&self) -> &LabLayout {
        &self.layout
    }

    /// Convert one source file. Never fails; problems land in the record.
    pub async fn run_conversion_test(
        &self,
        source_file: &Path,
        direction: Direction,
        tier: Tier,
        test_id: &str,
    ) -> ConversionRecord {
        let mut record = ConversionRecord::new(test_id, direction, source_file);
        info!("Starting conversion {}: {}", test_id, direction);

        if let Err(e) = self.convert_into(&mut record, source_file, direction, tier).await {
            record.status = ConversionStatus::Error;
            record.error = Some(e.to_string());
        }

        info!("[{}] {}", test_id, record.status);
        record
    }

    async fn convert_into(
        &self,
        record: &mut ConversionRecord,
        source_file: &Path,
        direction: Direction,
        tier: Tier,
    ) -> E2eResult<()> {
        let submitted = self
            .client
            .convert(source_file, direction.source, direction.target, self.options)
            .await?;

        let Some(job_id) = submitted.job_id.filter(|id| !id.is_empty()) else {
            record.status = ConversionStatus::Error;
            record.error = Some("No job ID returned".to_string());
            return Ok(());
        };
        info!("Job ID: {}", job_id);
        record.job_id = Some(job_id.clone());

        match self
            .client
            .wait_for_job(&job_id, self.job_timeout, self.poll_interval)
            .await?
        {
            JobOutcome::Completed(status) => {
                record.status = ConversionStatus::Success;
                record.job_status = Some(status);
                let output_dir = self
                    .layout
                    .converted_dir(direction.target, tier)
                    .join(&record.test_id);
                record.output_file = self.client.download_files(&job_id, &output_dir).await?;
            }
            JobOutcome::Failed(status) => {
                record.status = ConversionStatus::Failed;
                record.error = Some(status.error_message().unwrap_or_else(|| "Unknown error".to_string()));
                record.job_status = Some(status);
            }
            JobOutcome::TimedOut { waited, last } => {
                record.status = ConversionStatus::Timeout;
                record.error = Some(format!("Job did not complete within {}s", waited.as_secs()));
                record.job_status = last;
            }
        }
        Ok(())
    }

    /// Run up to `limit` artifacts per direction and save the records to
    /// `logs/conversion_results_{unix}.json`
    pub async fn run(&self, directions: &[Direction], tier: Tier, limit: usize) -> E2eResult<SessionSummary> {
        info!("Checking API health at {}", self.client.base_url());
        match self.client.health_check().await {
            Ok(health) => info!(
                "API status: {}",
                health.get("status").and_then(|s| s.as_str()).unwrap_or("unknown")
            ),
            Err(e) => {
                error!("Health check failed: {}", e);
                return Err(E2eError::ApiUnavailable(e.to_string()));
            }
        }

        self.layout.ensure_dirs()?;
        for entry in self.layout.inventory()? {
            info!(
                "Available: {}/{} ({}): {} artifacts",
                entry.platform,
                entry.tier,
                entry.platform.api_name(),
                entry.count
            );
        }

        let mut records = Vec::new();
        for &direction in directions {
            let artifacts = self.layout.list_artifacts(direction.source, tier)?;
            if artifacts.is_empty() {
                warn!("Skipping {}: no source artifacts", direction);
                continue;
            }
            info!("Testing {} ({} of {} artifacts)", direction, artifacts.len().min(limit), artifacts.len());

            for artifact in artifacts.iter().take(limit) {
                let test_id = artifact_test_id(artifact, direction);
                records.push(self.run_conversion_test(artifact, direction, tier, &test_id).await);
            }
        }

        let results_file = self
            .layout
            .logs_dir()
            .join(format!("conversion_results_{}.json", Utc::now().timestamp()));
        std::fs::write(&results_file, serde_json::to_string_pretty(&records)?)?;
        info!("Results saved to: {}", results_file.display());

        let counts = count_statuses(&records);
        for (status, count) in &counts {
            info!("  {}: {}", status, count);
        }

        Ok(SessionSummary { results_file, records, counts })
    }
}

/// Package file name without the platform extension
fn artifact_test_id(path: &Path, direction: Direction) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    name.strip_suffix(direction.source.extension())
        .map(str::to_string)
        .unwrap_or(name)
}

pub fn count_statuses(records: &[ConversionRecord]) -> BTreeMap<ConversionStatus, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.status).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlab_common::Platform;

    #[test]
    fn test_artifact_test_id_strips_platform_extension() {
        let direction = Direction::new(Platform::BluePrism, Platform::FlowBots);
        assert_eq!(
            artifact_test_id(Path::new("/lab/Simple_File_Read.bprelease"), direction),
            "Simple_File_Read"
        );
        let pad = Direction::new(Platform::PowerAutomateDesktop, Platform::UiPath);
        assert_eq!(artifact_test_id(Path::new("Simple_Sleep_Wait.zip"), pad), "Simple_Sleep_Wait");
    }

    #[test]
    fn test_record_serialization_omits_empty_fields() {
        let record = ConversionRecord::new(
            "Simple_File_Create",
            Direction::new(Platform::UiPath, Platform::FlowBots),
            Path::new("Simple_File_Create.nupkg"),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["source_platform"], "uipath");
        assert!(value.get("job_id").is_none());
        assert!(value.get("error").is_none());
    }
}
