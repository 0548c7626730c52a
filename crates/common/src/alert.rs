//! SMS alerting
//!
//! Messages are formatted as `[PRIORITY] PREFIX: message` and delivered through
//! an [`AlertTransport`]. Delivery problems are logged and reported as `false`;
//! alerting never aborts a test run.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::truncate_chars;
use crate::config::AlertConfig;
use crate::error::{Error, Result};

/// Alert priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Info,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Info => write!(f, "INFO"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
            Priority::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "INFO" => Ok(Priority::Info),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            "CRITICAL" => Ok(Priority::Critical),
            other => Err(Error::InvalidConfig(format!("unknown priority: {}", other))),
        }
    }
}

/// Something that can deliver a formatted alert body
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn deliver(&self, body: &str) -> Result<()>;
}

/// Writes alerts to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl AlertTransport for LogTransport {
    async fn deliver(&self, body: &str) -> Result<()> {
        info!("{}", body);
        Ok(())
    }
}

/// Twilio Messages API transport
#[derive(Debug, Clone)]
pub struct TwilioTransport {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    to_number: String,
}

impl TwilioTransport {
    /// Build from config; fails when any credential is missing
    pub fn from_config(config: &AlertConfig) -> Result<Self> {
        let required = |value: &Option<String>, name: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::InvalidConfig(format!("alert.{} is not set", name)))
        };

        Ok(Self {
            http: reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            account_sid: required(&config.account_sid, "account_sid")?,
            auth_token: required(&config.auth_token, "auth_token")?,
            from_number: required(&config.from_number, "from_number")?,
            to_number: required(&config.to_number, "to_number")?,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Messages.json", self.api_base, self.account_sid)
    }
}

#[async_trait]
impl AlertTransport for TwilioTransport {
    async fn deliver(&self, body: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", self.to_number.as_str()),
                ("From", self.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(Error::AlertDelivery(format!("HTTP {}: {}", status, truncate_chars(&text, 200))))
        }
    }
}

/// Priority-keyed alert helper
#[derive(Clone)]
pub struct Alerter {
    transport: Arc<dyn AlertTransport>,
    prefix: String,
}

impl fmt::Debug for Alerter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alerter").field("prefix", &self.prefix).finish()
    }
}

impl Alerter {
    /// SMS when enabled and fully configured, log-only otherwise
    pub fn from_config(config: &AlertConfig) -> Self {
        if !config.enabled {
            return Self::log_only(&config.prefix);
        }
        match TwilioTransport::from_config(config) {
            Ok(transport) => Self::with_transport(Arc::new(transport), &config.prefix),
            Err(e) => {
                warn!("SMS alerts disabled: {}", e);
                Self::log_only(&config.prefix)
            }
        }
    }

    pub fn log_only(prefix: &str) -> Self {
        Self::with_transport(Arc::new(LogTransport), prefix)
    }

    pub fn with_transport(transport: Arc<dyn AlertTransport>, prefix: &str) -> Self {
        Self {
            transport,
            prefix: prefix.to_string(),
        }
    }

    /// Format an alert body
    pub fn format_body(&self, priority: Priority, message: &str) -> String {
        format!("[{}] {}: {}", priority, self.prefix, message)
    }

    /// Send an alert. Returns whether delivery succeeded.
    pub async fn send(&self, priority: Priority, message: &str) -> bool {
        let body = self.format_body(priority, message);
        match self.transport.deliver(&body).await {
            Ok(()) => {
                info!("Alert sent: [{}] {}", priority, message);
                true
            }
            Err(e) => {
                warn!("Failed to send alert: {}", e);
                false
            }
        }
    }

    /// Tier completion alert; priority follows the pass rate
    pub async fn send_test_result(&self, tier: &str, passed: usize, total: usize) -> bool {
        let rate = pass_rate(passed, total);
        let message = format!("{} tier complete: {}/{} passed ({:.1}%)", tier, passed, total, rate);
        self.send(result_priority(rate), &message).await
    }

    /// Test failure alert with the first 100 characters of the error
    pub async fn send_failure_alert(&self, test_id: &str, error: &str) -> bool {
        let message = format!("Test {} failed: {}", test_id, truncate_chars(error, 100));
        self.send(Priority::Medium, &message).await
    }

    /// Resource threshold alert; `false` without sending when nothing is critical
    pub async fn send_resource_alert(&self, snapshot: &ResourceSnapshot) -> bool {
        match snapshot.critical_message() {
            Some(message) => self.send(Priority::High, &message).await,
            None => false,
        }
    }

    pub async fn send_recovery_alert(&self) -> bool {
        self.send(Priority::Info, "Recovery started - resuming from last checkpoint")
            .await
    }
}

/// Percentage of passed tests rounded to one decimal, 0 for an empty run
pub fn pass_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Priority of a tier completion alert
pub fn result_priority(rate: f64) -> Priority {
    if rate >= 85.0 {
        Priority::Info
    } else if rate >= 70.0 {
        Priority::Medium
    } else {
        Priority::High
    }
}

/// Host resource usage
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// CPU usage in percent
    pub cpu_percent: f64,
    /// Memory usage in percent
    pub memory_percent: f64,
    /// Free disk space in GB
    pub disk_free_gb: f64,
}

impl ResourceSnapshot {
    pub const CPU_LIMIT: f64 = 85.0;
    pub const MEMORY_LIMIT: f64 = 90.0;
    pub const DISK_FLOOR_GB: f64 = 10.0;

    /// Sample the host. Disk space is taken from the disk holding `path`.
    pub async fn capture(path: &Path) -> Self {
        use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};

        let mut sys = System::new();
        sys.refresh_cpu_usage();
        tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let memory_percent = if sys.total_memory() > 0 {
            sys.used_memory() as f64 / sys.total_memory() as f64 * 100.0
        } else {
            0.0
        };

        let disks = Disks::new_with_refreshed_list();
        let available = disks
            .list()
            .iter()
            .filter(|d| path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .or_else(|| disks.list().iter().max_by_key(|d| d.available_space()))
            .map(|d| d.available_space())
            .unwrap_or(0);

        Self {
            cpu_percent: f64::from(sys.global_cpu_usage()),
            memory_percent,
            disk_free_gb: available as f64 / 1_000_000_000.0,
        }
    }

    /// Alert text when any threshold is crossed
    pub fn critical_message(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.cpu_percent > Self::CPU_LIMIT {
            parts.push(format!("CPU at {:.1}%", self.cpu_percent));
        }
        if self.memory_percent > Self::MEMORY_LIMIT {
            parts.push(format!("Memory at {:.1}%", self.memory_percent));
        }
        if self.disk_free_gb < Self::DISK_FLOOR_GB {
            parts.push(format!("Disk only {:.1}GB free", self.disk_free_gb));
        }

        if parts.is_empty() {
            None
        } else {
            Some(format!("Resource critical: {}", parts.join(", ")))
        }
    }
}
