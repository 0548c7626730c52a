//! Test executors: how a single matrix test is carried out

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::conversion::{ConversionSession, ConversionStatus};
use flowlab_common::config::AgentConfig;
use flowlab_common::{CaseId, Direction, TestStatus, Tier};

/// One matrix test to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRequest {
    pub test_id: String,
    pub tier: Tier,
    pub direction: Direction,
    pub case: CaseId,
}

impl TestRequest {
    pub fn new(tier: Tier, direction: Direction, case: CaseId) -> Self {
        Self {
            test_id: flowlab_common::run_test_id(tier, direction, case),
            tier,
            direction,
            case,
        }
    }
}

/// Result of one matrix test, persisted as `runs/{test_id}.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub test_id: String,
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    fn new(test_id: &str, status: TestStatus) -> Self {
        Self {
            test_id: test_id.to_string(),
            status,
            output: None,
            error: None,
            duration_ms: 0,
            finished_at: Utc::now(),
        }
    }

    pub fn pass(test_id: &str, output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::new(test_id, TestStatus::Pass)
        }
    }

    pub fn failed(test_id: &str, status: TestStatus, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(test_id, status)
        }
    }

    fn timed(mut self, start: Instant) -> Self {
        self.duration_ms = start.elapsed().as_millis() as u64;
        self
    }
}

/// Executes a single matrix test
#[async_trait]
pub trait TestExecutor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn execute(&self, request: &TestRequest) -> ExecutionReport;
}

/// Drives an external agent CLI that performs the conversion end to end
#[derive(Debug, Clone)]
pub struct AgentExecutor {
    config: AgentConfig,
    target_root: String,
    timeout: Duration,
}

impl AgentExecutor {
    pub fn new(config: AgentConfig, target_root: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self {
            config,
            target_root: target_root.into(),
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model_for(&self, tier: Tier) -> &str {
        if tier.is_light() {
            &self.config.light_model
        } else {
            &self.config.heavy_model
        }
    }

    /// Instructions handed to the agent
    pub fn prompt(&self, request: &TestRequest) -> String {
        let root = self.target_root.trim_end_matches('\\');
        let source = request.direction.source.dir_name();
        let target = request.direction.target.dir_name();
        let tier = request.tier.dir_name();

        format!(
            "Execute FLOWBOTS conversion test:\n\
             - Test ID: {id}\n\
             - Source Platform: {source}\n\
             - Target Platform: {target}\n\
             - Tier: {tier}\n\
             \n\
             Steps:\n\
             1. Find source artifact at {root}\\artifacts_source\\{source}\\{tier}\\\n\
             2. Upload to flowbotsai.com and convert to {target}\n\
             3. Download converted artifact to {root}\\artifacts_converted\\{target}\\{tier}\\\n\
             4. Validate the converted artifact runs in target platform\n\
             5. Capture evidence (screenshots, logs)\n\
             6. Return PASS or FAIL with details\n",
            id = request.test_id,
        )
    }

    fn command(&self, request: &TestRequest) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("-p")
            .arg(self.prompt(request))
            .arg("--model")
            .arg(self.model_for(request.tier))
            .arg("--max-turns")
            .arg(self.config.max_turns.to_string())
            .arg("--output-format")
            .arg(&self.config.output_format)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// "5 minutes", "1 minute", "45 seconds" or "200 ms"
fn describe_timeout(timeout: Duration) -> String {
    let secs = timeout.as_secs();
    match secs {
        0 => format!("{} ms", timeout.as_millis()),
        60 => "1 minute".to_string(),
        s if s >= 60 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{} seconds", s),
    }
}

#[async_trait]
impl TestExecutor for AgentExecutor {
    fn name(&self) -> &'static str {
        "agent"
    }

    async fn execute(&self, request: &TestRequest) -> ExecutionReport {
        let start = Instant::now();
        debug!("Launching {} for {}", self.config.program, request.test_id);

        let output = tokio::time::timeout(self.timeout, self.command(request).output()).await;

        let report = match output {
            Err(_) => ExecutionReport::failed(
                &request.test_id,
                TestStatus::Timeout,
                format!("Test timed out after {}", describe_timeout(self.timeout)),
            ),
            Ok(Err(e)) => {
                warn!("Failed to launch {}: {}", self.config.program, e);
                ExecutionReport::failed(
                    &request.test_id,
                    TestStatus::Error,
                    format!("Failed to launch {}: {}", self.config.program, e),
                )
            }
            Ok(Ok(out)) if out.status.success() => {
                ExecutionReport::pass(&request.test_id, String::from_utf8_lossy(&out.stdout))
            }
            Ok(Ok(out)) => ExecutionReport::failed(
                &request.test_id,
                TestStatus::Fail,
                String::from_utf8_lossy(&out.stderr),
            ),
        };
        report.timed(start)
    }
}

/// Converts the test's source artifact through the conversion API
#[derive(Debug, Clone)]
pub struct ApiExecutor {
    session: ConversionSession,
}

impl ApiExecutor {
    pub fn new(session: ConversionSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl TestExecutor for ApiExecutor {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn execute(&self, request: &TestRequest) -> ExecutionReport {
        let start = Instant::now();
        let direction = request.direction;

        if !direction.api_supported() {
            return ExecutionReport::failed(
                &request.test_id,
                TestStatus::Error,
                format!("Direction {} is not supported by the conversion API", direction),
            )
            .timed(start);
        }

        let catalog_name = flowlab_fixtures::lookup(request.case).map(|c| c.name);
        let artifact = match self.session.layout().find_artifact(
            direction.source,
            request.tier,
            request.case,
            catalog_name,
        ) {
            Ok(Some(path)) => path,
            Ok(None) => {
                return ExecutionReport::failed(
                    &request.test_id,
                    TestStatus::Error,
                    format!(
                        "No {} source artifact for {}",
                        direction.source.display_name(),
                        request.case
                    ),
                )
                .timed(start)
            }
            Err(e) => {
                return ExecutionReport::failed(&request.test_id, TestStatus::Error, e.to_string())
                    .timed(start)
            }
        };

        let record = self
            .session
            .run_conversion_test(&artifact, direction, request.tier, &request.test_id)
            .await;

        let report = match record.status {
            ConversionStatus::Success => {
                let output = record
                    .output_file
                    .map(|p| p.display().to_string())
                    .or(record.job_id)
                    .unwrap_or_default();
                ExecutionReport::pass(&request.test_id, output)
            }
            ConversionStatus::Failed => ExecutionReport::failed(
                &request.test_id,
                TestStatus::Fail,
                record.error.unwrap_or_default(),
            ),
            ConversionStatus::Timeout => ExecutionReport::failed(
                &request.test_id,
                TestStatus::Timeout,
                record.error.unwrap_or_default(),
            ),
            ConversionStatus::Error | ConversionStatus::Pending => ExecutionReport::failed(
                &request.test_id,
                TestStatus::Error,
                record.error.unwrap_or_default(),
            ),
        };
        report.timed(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlab_common::Platform;
    use test_case::test_case;

    fn request(tier: Tier) -> TestRequest {
        let case = tier.cases().next().unwrap();
        TestRequest::new(tier, Direction::new(Platform::UiPath, Platform::PowerAutomateDesktop), case)
    }

    #[test]
    fn test_request_id() {
        assert_eq!(request(Tier::Simple).test_id, "FB-SIMPLE-UIPATH-to-PAD-S01");
    }

    #[test_case(Tier::Simple, "haiku")]
    #[test_case(Tier::Moderate, "haiku")]
    #[test_case(Tier::Complex, "sonnet")]
    #[test_case(Tier::Enterprise, "sonnet")]
    fn test_model_selection(tier: Tier, model: &str) {
        let agent = AgentExecutor::new(AgentConfig::default(), r"C:\flowbots_lab");
        assert_eq!(agent.model_for(tier), model);
    }

    #[test]
    fn test_prompt_names_directories() {
        let agent = AgentExecutor::new(AgentConfig::default(), r"D:\lab\");
        let prompt = agent.prompt(&request(Tier::Simple));
        assert!(prompt.contains("- Test ID: FB-SIMPLE-UIPATH-to-PAD-S01"));
        assert!(prompt.contains(r"D:\lab\artifacts_source\uipath\simple\"));
        assert!(prompt.contains(r"D:\lab\artifacts_converted\pad\simple\"));
        assert!(prompt.contains("6. Return PASS or FAIL with details"));
    }

    #[test_case(300, "5 minutes")]
    #[test_case(60, "1 minute")]
    #[test_case(90, "90 seconds")]
    #[test_case(1, "1 second")]
    fn test_describe_timeout(secs: u64, expected: &str) {
        assert_eq!(describe_timeout(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn test_describe_sub_second_timeout() {
        assert_eq!(describe_timeout(Duration::from_millis(200)), "200 ms");
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let config = AgentConfig {
            program: "/nonexistent/flowlab-agent".to_string(),
            ..Default::default()
        };
        let report = AgentExecutor::new(config, r"C:\flowbots_lab")
            .execute(&request(Tier::Simple))
            .await;
        assert_eq!(report.status, TestStatus::Error);
        assert!(report.error.unwrap().contains("Failed to launch"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_agent_exit_codes_and_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let script = |name: &str, body: &str| {
            let path = tmp.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.display().to_string()
        };
        let ok = script("ok.sh", r#"printf '%s\n' "args: $*""#);
        let bad = script("bad.sh", "echo 'upload rejected' >&2\nexit 3");
        let slow = script("slow.sh", "sleep 5");

        let agent = |program: String| {
            AgentExecutor::new(AgentConfig { program, ..Default::default() }, r"C:\flowbots_lab")
        };

        let pass = agent(ok).execute(&request(Tier::Complex)).await;
        assert_eq!(pass.status, TestStatus::Pass);
        let out = pass.output.unwrap();
        assert!(out.contains("--model sonnet"));
        assert!(out.contains("--max-turns 5"));
        assert!(out.contains("--output-format json"));

        let fail = agent(bad).execute(&request(Tier::Simple)).await;
        assert_eq!(fail.status, TestStatus::Fail);
        assert_eq!(fail.error.as_deref().map(str::trim), Some("upload rejected"));

        let timeout = agent(slow)
            .with_timeout(Duration::from_millis(200))
            .execute(&request(Tier::Simple))
            .await;
        assert_eq!(timeout.status, TestStatus::Timeout);
        assert_eq!(timeout.error.as_deref(), Some("Test timed out after 200 ms"));
    }
}
