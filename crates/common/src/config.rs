//! Lab configuration
//!
//! Loaded from a TOML file; a missing file yields the defaults. Secrets are
//! never stored in the defaults and are normally supplied through the
//! environment (see [`LabConfig::apply_env`]).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Top-level lab configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Directory layout
    pub lab: LabPaths,

    /// Conversion API settings
    pub api: ApiConfig,

    /// SMS alerting
    pub alert: AlertConfig,

    /// External agent CLI used by the matrix runner
    pub agent: AgentConfig,

    /// Matrix runner behaviour
    pub runner: RunnerSettings,

    /// Browser explorer
    pub explorer: ExplorerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabPaths {
    /// Local lab root holding artifacts, runs and logs
    pub root: PathBuf,

    /// Root path embedded inside generated workflows (paths on the robot host)
    pub target_root: String,
}

impl Default for LabPaths {
    fn default() -> Self {
        Self {
            root: crate::default_lab_root(),
            target_root: r"C:\flowbots_lab".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub app_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub job_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub generate_api: bool,
    pub generate_docker: bool,
    pub generate_documentation: bool,
    pub use_agent: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.flowbotsai.com".to_string(),
            app_url: "https://app.flowbotsai.com".to_string(),
            api_key: None,
            request_timeout_secs: 30,
            upload_timeout_secs: 120,
            job_timeout_secs: 300,
            poll_interval_secs: 5,
            generate_api: false,
            generate_docker: false,
            generate_documentation: true,
            use_agent: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_number: Option<String>,
    pub api_base: String,
    /// Product tag placed after the priority in every message
    pub prefix: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            account_sid: None,
            auth_token: None,
            from_number: None,
            to_number: None,
            api_base: "https://api.twilio.com".to_string(),
            prefix: "FLOWBOTS".to_string(),
        }
    }
}

impl AlertConfig {
    /// All four SMS credentials are present
    pub fn has_credentials(&self) -> bool {
        [&self.account_sid, &self.auth_token, &self.from_number, &self.to_number]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub program: String,
    /// Model for the simple and moderate tiers
    pub light_model: String,
    /// Model for the remaining tiers
    pub heavy_model: String,
    pub max_turns: u32,
    pub output_format: String,
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            light_model: "haiku".to_string(),
            heavy_model: "sonnet".to_string(),
            max_turns: 5,
            output_format: "json".to_string(),
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Pause between two matrix tests
    pub pause_ms: u64,
    /// Consecutive failures before a failure alert goes out
    pub failure_alert_threshold: u32,
    /// Artifacts tried per direction by the direct API session
    pub artifacts_per_direction: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            pause_ms: 1000,
            failure_alert_threshold: 3,
            artifacts_per_direction: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub browser: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub email_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            browser: "chromium".to_string(),
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            email_selector: "input[type='email'], input[name='email'], input[id*='email']".to_string(),
            password_selector: "input[type='password']".to_string(),
            submit_selector: "button[type='submit']".to_string(),
        }
    }
}

impl LabConfig {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from file, then overlay process environment variables
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay values from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(root) = get("FLOWLAB_ROOT") {
            self.lab.root = PathBuf::from(root);
        }
        if let Some(key) = get("FLOWBOTS_API_KEY") {
            self.api.api_key = Some(key);
        }
        if let Some(email) = get("FLOWBOTS_EMAIL") {
            self.explorer.email = Some(email);
        }
        if let Some(password) = get("FLOWBOTS_PASSWORD") {
            self.explorer.password = Some(password);
        }
        if let Some(sid) = get("TWILIO_ACCOUNT_SID") {
            self.alert.account_sid = Some(sid);
        }
        if let Some(token) = get("TWILIO_AUTH_TOKEN") {
            self.alert.auth_token = Some(token);
        }
        if let Some(from) = get("TWILIO_FROM_NUMBER") {
            self.alert.from_number = Some(from);
        }
        if let Some(to) = get("TWILIO_TO_NUMBER") {
            self.alert.to_number = Some(to);
        }
    }

    /// Directory layout rooted at `lab.root`
    pub fn layout(&self) -> crate::layout::LabLayout {
        crate::layout::LabLayout::new(&self.lab.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = LabConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.api.job_timeout_secs, 300);
        assert_eq!(config.api.poll_interval_secs, 5);
        assert_eq!(config.runner.failure_alert_threshold, 3);
        assert!(config.api.generate_documentation);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lab.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "http://127.0.0.1:9000"
poll_interval_secs = 1

[agent]
max_turns = 9
"#,
        )
        .unwrap();

        let config = LabConfig::load(&path).unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.api.poll_interval_secs, 1);
        assert_eq!(config.api.upload_timeout_secs, 120);
        assert_eq!(config.agent.max_turns, 9);
        assert_eq!(config.agent.program, "claude");
    }

    #[test]
    fn test_save_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/lab.toml");
        let mut config = LabConfig::default();
        config.runner.pause_ms = 0;
        config.save(&path).unwrap();

        let loaded = LabConfig::load(&path).unwrap();
        assert_eq!(loaded.runner.pause_ms, 0);
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<&str, &str> = [
            ("FLOWBOTS_API_KEY", "k-123"),
            ("TWILIO_ACCOUNT_SID", "AC1"),
            ("TWILIO_AUTH_TOKEN", "tok"),
            ("TWILIO_FROM_NUMBER", "+100"),
            ("TWILIO_TO_NUMBER", ""),
            ("FLOWLAB_ROOT", "/srv/lab"),
        ]
        .into_iter()
        .collect();

        let mut config = LabConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.lab.root, PathBuf::from("/srv/lab"));
        assert!(config.alert.to_number.is_none());
        assert!(!config.alert.has_credentials());

        config.alert.to_number = Some("+200".into());
        assert!(config.alert.has_credentials());
    }
}
