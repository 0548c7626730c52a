//! Matrix runner: every direction x every case of a tier, with checkpoints
//! and SMS alerting

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::E2eResult;
use crate::executor::{ExecutionReport, TestExecutor, TestRequest};
use flowlab_common::alert::pass_rate;
use flowlab_common::config::RunnerSettings;
use flowlab_common::{
    Alerter, CaseId, Direction, Priority, ResourceSnapshot, TestStatus, Tier, CONVERSION_MATRIX,
};

/// Result of one tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierSummary {
    pub tier: Tier,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    /// Tests skipped because a previous run already passed them
    #[serde(default)]
    pub resumed: usize,
}

/// Selection and behaviour switches for a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip tests whose checkpoint records a PASS
    pub resume: bool,
    /// Only the first `n` cases of each tier
    pub limit: Option<usize>,
    /// Subset of the conversion matrix; the full matrix when `None`
    pub directions: Option<Vec<Direction>>,
    /// Sample host resources after each tier and alert on thresholds
    pub monitor_resources: bool,
}

/// Runs the conversion matrix through a [`TestExecutor`]
pub struct TestRunner {
    executor: Arc<dyn TestExecutor>,
    alerter: Alerter,
    runs_dir: PathBuf,
    pause: Duration,
    failure_threshold: u32,
    options: RunOptions,
    consecutive_failures: u32,
    recovery_announced: bool,
}

impl TestRunner {
    pub fn new(
        executor: Arc<dyn TestExecutor>,
        alerter: Alerter,
        runs_dir: impl Into<PathBuf>,
        settings: &RunnerSettings,
    ) -> Self {
        Self {
            executor,
            alerter,
            runs_dir: runs_dir.into(),
            pause: Duration::from_millis(settings.pause_ms),
            failure_threshold: settings.failure_alert_threshold.max(1),
            options: RunOptions::default(),
            consecutive_failures: 0,
            recovery_announced: false,
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Directions this run covers, in matrix order
    pub fn directions(&self) -> Vec<Direction> {
        match &self.options.directions {
            Some(subset) => CONVERSION_MATRIX
                .into_iter()
                .filter(|d| subset.contains(d))
                .collect(),
            None => CONVERSION_MATRIX.to_vec(),
        }
    }

    /// Cases of a tier this run covers
    pub fn cases(&self, tier: Tier) -> Vec<CaseId> {
        let cases = tier.cases();
        match self.options.limit {
            Some(n) => cases.take(n).collect(),
            None => cases.collect(),
        }
    }

    /// Number of tests a run over `tiers` will execute
    pub fn planned_tests(&self, tiers: &[Tier]) -> usize {
        let directions = self.directions().len();
        tiers.iter().map(|t| directions * self.cases(*t).len()).sum()
    }

    /// Run every tier in order
    pub async fn run_all(&mut self) -> E2eResult<Vec<TierSummary>> {
        let planned = self.planned_tests(&Tier::ALL);
        self.alerter
            .send(
                Priority::Info,
                &format!("Starting E2E testing - {} tests", planned),
            )
            .await;

        let mut summaries = Vec::new();
        for tier in Tier::ALL {
            info!("{}", "=".repeat(60));
            info!("TIER: {}", tier.dir_name().to_uppercase());
            info!("{}", "=".repeat(60));
            summaries.push(self.run_tier(tier).await?);
        }

        self.alerter
            .send(Priority::Info, "E2E testing complete!")
            .await;
        Ok(summaries)
    }

    /// Run every selected direction and case of one tier
    pub async fn run_tier(&mut self, tier: Tier) -> E2eResult<TierSummary> {
        std::fs::create_dir_all(&self.runs_dir)?;
        if self.options.resume && !self.recovery_announced && self.has_checkpoints()? {
            self.alerter.send_recovery_alert().await;
            self.recovery_announced = true;
        }

        let cases = self.cases(tier);
        let mut total = 0;
        let mut passed = 0;
        let mut resumed = 0;

        for direction in self.directions() {
            for &case in &cases {
                let request = TestRequest::new(tier, direction, case);
                total += 1;

                if self.options.resume && self.already_passed(&request.test_id) {
                    debug!("Skipping {} (passed in a previous run)", request.test_id);
                    passed += 1;
                    resumed += 1;
                    continue;
                }

                info!("Running: {}", request.test_id);
                let report = self.executor.execute(&request).await;
                if report.status == TestStatus::Pass {
                    passed += 1;
                }
                self.record(&report).await?;

                if !self.pause.is_zero() {
                    tokio::time::sleep(self.pause).await;
                }
            }
        }

        let summary = TierSummary {
            tier,
            total,
            passed,
            failed: total - passed,
            pass_rate: pass_rate(passed, total),
            resumed,
        };
        info!(
            "{} complete: {}/{} ({}%)",
            tier.dir_name().to_uppercase(),
            summary.passed,
            summary.total,
            summary.pass_rate
        );
        self.alerter.send_test_result(tier.dir_name(), passed, total).await;

        if self.options.monitor_resources {
            let snapshot = ResourceSnapshot::capture(&self.runs_dir).await;
            self.alerter.send_resource_alert(&snapshot).await;
        }

        Ok(summary)
    }

    /// Persist a report and update the failure streak
    async fn record(&mut self, report: &ExecutionReport) -> E2eResult<()> {
        match report.status {
            TestStatus::Pass => {
                self.consecutive_failures = 0;
                info!("[PASS] {}", report.test_id);
            }
            TestStatus::Fail => {
                self.consecutive_failures += 1;
                error!("[FAIL] {}", report.test_id);
                if self.consecutive_failures >= self.failure_threshold {
                    let error = report.error.as_deref().unwrap_or_default();
                    self.alerter.send_failure_alert(&report.test_id, error).await;
                }
            }
            status => {
                warn!(
                    "[{}] {}: {}",
                    status,
                    report.test_id,
                    report.error.as_deref().unwrap_or_default()
                );
            }
        }

        self.save_result(report)?;
        Ok(())
    }

    fn checkpoint_path(&self, test_id: &str) -> PathBuf {
        self.runs_dir.join(format!("{}.json", test_id))
    }

    /// Write `runs/{test_id}.json`
    pub fn save_result(&self, report: &ExecutionReport) -> E2eResult<PathBuf> {
        let path = self.checkpoint_path(&report.test_id);
        std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
        Ok(path)
    }

    /// Previously persisted report, if readable
    pub fn load_checkpoint(&self, test_id: &str) -> Option<ExecutionReport> {
        load_report(&self.checkpoint_path(test_id))
    }

    fn already_passed(&self, test_id: &str) -> bool {
        self.load_checkpoint(test_id)
            .is_some_and(|r| r.status == TestStatus::Pass)
    }

    fn has_checkpoints(&self) -> E2eResult<bool> {
        for entry in std::fs::read_dir(&self.runs_dir)? {
            if entry?.path().extension().is_some_and(|e| e == "json") {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn load_report(path: &Path) -> Option<ExecutionReport> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("Ignoring unreadable checkpoint {}: {}", path.display(), e);
            None
        }
    }
}

/// All reports in a runs directory
pub fn load_results(runs_dir: &Path) -> E2eResult<Vec<ExecutionReport>> {
    let mut reports = Vec::new();
    if !runs_dir.is_dir() {
        return Ok(reports);
    }
    for entry in std::fs::read_dir(runs_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "json") {
            if let Some(report) = load_report(&path) {
                reports.push(report);
            }
        }
    }
    reports.sort_by(|a, b| a.test_id.cmp(&b.test_id));
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flowlab_common::alert::AlertTransport;
    use flowlab_common::Platform;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use test_case::test_case;

    /// Replays scripted statuses, then passes
    #[derive(Default)]
    struct Scripted {
        statuses: Mutex<VecDeque<TestStatus>>,
        seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(statuses: &[TestStatus]) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                seen: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl TestExecutor for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn execute(&self, request: &TestRequest) -> ExecutionReport {
            self.seen.lock().unwrap().push(request.test_id.clone());
            match self.statuses.lock().unwrap().pop_front() {
                None | Some(TestStatus::Pass) => ExecutionReport::pass(&request.test_id, "ok"),
                Some(status) => ExecutionReport::failed(&request.test_id, status, "converter crashed"),
            }
        }
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl AlertTransport for Recording {
        async fn deliver(&self, body: &str) -> flowlab_common::Result<()> {
            self.0.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    fn settings() -> RunnerSettings {
        RunnerSettings {
            pause_ms: 0,
            ..Default::default()
        }
    }

    fn runner(
        executor: Arc<Scripted>,
        dir: &TempDir,
        options: RunOptions,
    ) -> (TestRunner, Arc<Recording>) {
        let transport = Arc::new(Recording::default());
        let alerter = Alerter::with_transport(transport.clone(), "FLOWBOTS");
        let runner = TestRunner::new(executor, alerter, dir.path().join("runs"), &settings())
            .with_options(options);
        (runner, transport)
    }

    fn one_direction(limit: usize) -> RunOptions {
        RunOptions {
            limit: Some(limit),
            directions: Some(vec![Direction::new(Platform::UiPath, Platform::FlowBots)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_planned_tests() {
        let tmp = TempDir::new().unwrap();
        let (full, _) = runner(Scripted::new(&[]), &tmp, RunOptions::default());
        assert_eq!(full.planned_tests(&Tier::ALL), 24 * 20 * 5);

        let (limited, _) = runner(Scripted::new(&[]), &tmp, one_direction(2));
        assert_eq!(limited.planned_tests(&[Tier::Simple]), 2);
        assert_eq!(limited.directions(), vec![Direction::new(Platform::UiPath, Platform::FlowBots)]);
    }

    #[tokio::test]
    async fn test_tier_summary_and_checkpoints() {
        let tmp = TempDir::new().unwrap();
        let executor = Scripted::new(&[TestStatus::Pass, TestStatus::Fail, TestStatus::Timeout]);
        let (mut runner, alerts) = runner(executor.clone(), &tmp, one_direction(4));

        let summary = runner.run_tier(Tier::Simple).await.unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.pass_rate, 50.0);

        let saved = load_results(&tmp.path().join("runs")).unwrap();
        assert_eq!(saved.len(), 4);
        let failed = runner.load_checkpoint("FB-SIMPLE-UIPATH-to-FLOWBOTS-S02").unwrap();
        assert_eq!(failed.status, TestStatus::Fail);
        assert_eq!(failed.error.as_deref(), Some("converter crashed"));

        let sent = alerts.0.lock().unwrap();
        assert_eq!(sent.as_slice(), ["[HIGH] FLOWBOTS: simple tier complete: 2/4 passed (50.0%)"]);
    }

    #[test_case(&[TestStatus::Fail, TestStatus::Fail, TestStatus::Fail], 1 ; "three failures alert")]
    #[test_case(&[TestStatus::Fail, TestStatus::Fail, TestStatus::Pass, TestStatus::Fail], 0 ; "pass resets streak")]
    #[test_case(&[TestStatus::Fail, TestStatus::Timeout, TestStatus::Fail, TestStatus::Fail], 1 ; "timeout keeps streak")]
    #[test_case(&[TestStatus::Fail, TestStatus::Fail, TestStatus::Fail, TestStatus::Fail], 2 ; "alert repeats past threshold")]
    fn test_failure_streak(statuses: &[TestStatus], expected_alerts: usize) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let tmp = TempDir::new().unwrap();
            let (mut runner, alerts) = runner(Scripted::new(statuses), &tmp, one_direction(statuses.len()));
            runner.run_tier(Tier::Simple).await.unwrap();

            let failure_alerts = alerts
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.starts_with("[MEDIUM] FLOWBOTS: Test "))
                .count();
            assert_eq!(failure_alerts, expected_alerts);
        });
    }

    #[tokio::test]
    async fn test_resume_skips_passed_and_announces_recovery() {
        let tmp = TempDir::new().unwrap();
        {
            let first = Scripted::new(&[TestStatus::Pass, TestStatus::Fail]);
            let (mut runner, _) = runner(first, &tmp, one_direction(3));
            runner.run_tier(Tier::Simple).await.unwrap();
        }

        let second = Scripted::new(&[]);
        let options = RunOptions {
            resume: true,
            ..one_direction(3)
        };
        let (mut runner, alerts) = runner(second.clone(), &tmp, options);
        let summary = runner.run_tier(Tier::Simple).await.unwrap();

        assert_eq!(summary.resumed, 2);
        assert_eq!(summary.passed, 3);
        assert_eq!(
            second.seen.lock().unwrap().as_slice(),
            ["FB-SIMPLE-UIPATH-to-FLOWBOTS-S02"]
        );
        assert_eq!(
            alerts.0.lock().unwrap()[0],
            "[INFO] FLOWBOTS: Recovery started - resuming from last checkpoint"
        );
    }

    #[tokio::test]
    async fn test_run_all_sends_start_and_completion() {
        let tmp = TempDir::new().unwrap();
        let (mut runner, alerts) = runner(Scripted::new(&[]), &tmp, one_direction(1));
        let summaries = runner.run_all().await.unwrap();
        assert_eq!(summaries.len(), 5);
        assert!(summaries.iter().all(|s| s.pass_rate == 100.0));

        let sent = alerts.0.lock().unwrap();
        assert_eq!(sent.first().unwrap(), "[INFO] FLOWBOTS: Starting E2E testing - 5 tests");
        assert_eq!(sent.last().unwrap(), "[INFO] FLOWBOTS: E2E testing complete!");
        assert_eq!(sent.len(), 7);
    }
}
