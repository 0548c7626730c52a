//! Conversion API client
//!
//! Thin session over the remote conversion service: submit a job, poll its
//! status, download the converted bundle, and request a migration assessment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::Platform;

/// Maximum number of body characters kept in an API error
const ERROR_BODY_LIMIT: usize = 500;

const API_KEY_HEADER: &str = "X-API-Key";

/// Response to a conversion submission (HTTP 202)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub files_url: Option<String>,
}

/// Remote job state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Queued,
    Running,
    Processing,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Job status document; unknown fields are kept verbatim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default, deserialize_with = "null_as_unknown")]
    pub status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `"status": null` reads as [`JobState::Unknown`]
fn null_as_unknown<'de, D>(deserializer: D) -> std::result::Result<JobState, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<JobState>::deserialize(deserializer)?.unwrap_or_default())
}

impl JobStatus {
    /// Error text reported by the service, if any
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| match e {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Final result of waiting on a job
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Completed(JobStatus),
    Failed(JobStatus),
    /// `last` is the final status polled before giving up
    TimedOut { waited: Duration, last: Option<JobStatus> },
}

/// Optional flags sent with a conversion job
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    pub generate_api: bool,
    pub generate_docker: bool,
    pub generate_documentation: bool,
    pub use_agent: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            generate_api: false,
            generate_docker: false,
            generate_documentation: true,
            use_agent: false,
        }
    }
}

impl From<&ApiConfig> for ConvertOptions {
    fn from(config: &ApiConfig) -> Self {
        Self {
            generate_api: config.generate_api,
            generate_docker: config.generate_docker,
            generate_documentation: config.generate_documentation,
            use_agent: config.use_agent,
        }
    }
}

/// Raw response used by endpoint discovery
#[derive(Debug, Clone, Serialize)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Client for the conversion API
#[derive(Debug, Clone)]
pub struct ConversionClient {
    http: reqwest::Client,
    api_key: Option<HeaderValue>,
    base_url: String,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl ConversionClient {
    /// Create a client from the API section of the lab config
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = match config.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => {
                let mut value = HeaderValue::from_str(key)
                    .map_err(|e| Error::InvalidConfig(format!("api_key: {}", e)))?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Whether an absolute URL points at the API itself
    fn is_api_url(&self, url: &str) -> bool {
        match url.strip_prefix(&self.base_url) {
            Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
            None => false,
        }
    }

    /// Request builder carrying the API key, only for URLs under the API base
    fn request(&self, method: reqwest::Method, url: String) -> RequestBuilder {
        let builder = self.http.request(method, &url);
        match &self.api_key {
            Some(key) if self.is_api_url(&url) => builder.header(API_KEY_HEADER, key.clone()),
            _ => builder,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::GET, self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::POST, self.url(path))
    }

    /// Check API health
    pub async fn health_check(&self) -> Result<serde_json::Value> {
        let resp = self
            .get("/health")
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(resp.json().await?)
    }

    /// Start a conversion job
    pub async fn convert(
        &self,
        file: &Path,
        source: Platform,
        target: Platform,
        options: ConvertOptions,
    ) -> Result<ConvertResponse> {
        check_direction(source, target)?;

        let form = file_form(file)
            .await?
            .text("sourcePlatform", source.api_name())
            .text("targetPlatform", target.api_name())
            .text("generateApi", options.generate_api.to_string())
            .text("generateDocker", options.generate_docker.to_string())
            .text("generateDocumentation", options.generate_documentation.to_string())
            .text("useAgent", options.use_agent.to_string());

        debug!("Submitting {} ({} -> {})", file.display(), source.api_name(), target.api_name());

        let resp = self
            .post("/api/v1/convert")
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await?;

        if resp.status() == StatusCode::ACCEPTED {
            Ok(resp.json().await?)
        } else {
            Err(api_error(resp).await)
        }
    }

    /// Get job status
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let resp = self
            .get(&format!("/api/v1/jobs/{}", job_id))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(resp.json().await?)
    }

    /// Poll a job until it completes, fails, or `timeout` elapses
    pub async fn wait_for_job(
        &self,
        job_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<JobOutcome> {
        let start = Instant::now();
        let mut last = None;

        while start.elapsed() < timeout {
            let status = self.job_status(job_id).await?;
            debug!("Job {} is {:?}", job_id, status.status);

            match status.status {
                JobState::Completed => return Ok(JobOutcome::Completed(status)),
                JobState::Failed => return Ok(JobOutcome::Failed(status)),
                _ => last = Some(status),
            }

            sleep(poll_interval).await;
        }

        warn!("Job {} did not complete within {}s", job_id, timeout.as_secs());
        Ok(JobOutcome::TimedOut {
            waited: start.elapsed(),
            last,
        })
    }

    /// Download converted files as a zip into `output_dir/{job_id}.zip`.
    /// Returns `None` when the service does not answer 200.
    pub async fn download_files(&self, job_id: &str, output_dir: &Path) -> Result<Option<PathBuf>> {
        let resp = self
            .get(&format!("/api/v1/jobs/{}/files", job_id))
            .query(&[("format", "zip")])
            .timeout(self.upload_timeout)
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            warn!("Download for job {} returned {}", job_id, resp.status());
            return Ok(None);
        }

        let bytes = resp.bytes().await?;
        tokio::fs::create_dir_all(output_dir).await?;
        let zip_path = output_dir.join(format!("{}.zip", job_id));
        tokio::fs::write(&zip_path, &bytes).await?;

        info!("Downloaded {} bytes to {}", bytes.len(), zip_path.display());
        Ok(Some(zip_path))
    }

    /// Assess a workflow for migration
    pub async fn assess(&self, file: &Path, source: Platform, target: Platform) -> Result<serde_json::Value> {
        check_direction(source, target)?;

        let form = file_form(file)
            .await?
            .text("sourcePlatform", source.api_name())
            .text("targetPlatform", target.api_name())
            .text("includeEstimation", "true")
            .text("includeSecurityScan", "true")
            .text("includeStatistics", "true");

        let resp = self
            .post("/api/v1/assess")
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(api_error(resp).await)
        }
    }

    /// GET an absolute URL or a path relative to the API base, without
    /// interpreting the status. The API key is only sent to the API host.
    pub async fn get_raw(&self, url_or_path: &str, timeout: Duration) -> Result<RawResponse> {
        let url = if url_or_path.starts_with("http://") || url_or_path.starts_with("https://") {
            url_or_path.to_string()
        } else {
            self.url(url_or_path)
        };
        let resp = self
            .request(reqwest::Method::GET, url)
            .timeout(timeout)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(RawResponse { status, body })
    }
}

fn check_direction(source: Platform, target: Platform) -> Result<()> {
    if !source.is_api_source() {
        return Err(Error::UnsupportedPlatform {
            platform: source.api_name().to_string(),
            role: "source",
        });
    }
    if !target.is_api_target() {
        return Err(Error::UnsupportedPlatform {
            platform: target.api_name().to_string(),
            role: "target",
        });
    }
    Ok(())
}

async fn file_form(file: &Path) -> Result<Form> {
    let data = tokio::fs::read(file).await?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.bin".to_string());
    Ok(Form::new().part("file", Part::bytes(data).file_name(name)))
}

async fn api_error(resp: reqwest::Response) -> Error {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Error::Api {
        status,
        message: truncate_chars(&body, ERROR_BODY_LIMIT),
    }
}

/// First `limit` characters of `text`
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
