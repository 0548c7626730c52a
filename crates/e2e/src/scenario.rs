//! Declarative YAML exploration scenarios

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{E2eError, E2eResult};
use flowlab_common::config::ExplorerSettings;

/// Environment variable holding the login email for the browser process
pub const EMAIL_ENV: &str = "FLOWBOTS_EMAIL";
/// Environment variable holding the login password for the browser process
pub const PASSWORD_ENV: &str = "FLOWBOTS_PASSWORD";

/// A scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub steps: Vec<ScenarioStep>,
}

/// A single browser step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Open a URL (absolute, or relative to the app URL)
    Navigate { url: String },

    /// Fill an input. A value of the form `env:NAME` is read from the
    /// browser process environment instead of being written into the script.
    Fill {
        selector: String,
        value: String,
        #[serde(default)]
        optional: bool,
    },

    Click {
        selector: String,
        #[serde(default = "default_click_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        optional: bool,
    },

    /// Wait for an element
    Wait {
        selector: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        optional: bool,
    },

    Sleep { ms: u64 },

    /// Screenshot saved as `{name}_{unix}.png`
    Screenshot {
        name: String,
        #[serde(default)]
        full_page: bool,
    },

    /// Collect inputs, buttons, links and file inputs on the current page
    Discover,

    Log { message: String },
}

fn default_click_timeout() -> u64 {
    5000
}

fn default_wait_timeout() -> u64 {
    10000
}

impl ScenarioStep {
    /// A failing optional step is recorded and the scenario continues
    pub fn is_optional(&self) -> bool {
        match self {
            ScenarioStep::Fill { optional, .. }
            | ScenarioStep::Click { optional, .. }
            | ScenarioStep::Wait { optional, .. } => *optional,
            _ => false,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ScenarioStep::Navigate { url } => format!("navigate:{}", url),
            ScenarioStep::Fill { selector, .. } => format!("fill:{}", selector),
            ScenarioStep::Click { selector, .. } => format!("click:{}", selector),
            ScenarioStep::Wait { selector, .. } => format!("wait:{}", selector),
            ScenarioStep::Sleep { ms } => format!("sleep:{}ms", ms),
            ScenarioStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            ScenarioStep::Discover => "discover".to_string(),
            ScenarioStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        if scenario.steps.is_empty() {
            return Err(E2eError::ScenarioParse(format!("scenario '{}' has no steps", scenario.name)));
        }
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load every `.yaml`/`.yml` scenario under a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file()
                    && e.path()
                        .extension()
                        .map(|ext| ext == "yaml" || ext == "yml")
                        .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    /// One scenario from a file, or all scenarios from a directory
    pub fn load(path: &Path) -> E2eResult<Vec<Self>> {
        if path.is_dir() {
            Self::load_all(path)
        } else {
            Ok(vec![Self::from_file(path)?])
        }
    }

    /// Landing page, optional login, then element discovery
    pub fn default_login(app_url: &str, settings: &ExplorerSettings) -> Self {
        let mut steps = vec![
            ScenarioStep::Navigate { url: app_url.to_string() },
            ScenarioStep::Sleep { ms: 3000 },
            ScenarioStep::Screenshot { name: "01_landing".into(), full_page: false },
        ];

        let has_credentials = settings.email.as_deref().is_some_and(|e| !e.is_empty())
            && settings.password.as_deref().is_some_and(|p| !p.is_empty());
        if has_credentials {
            steps.extend([
                ScenarioStep::Wait {
                    selector: settings.email_selector.clone(),
                    timeout_ms: 10000,
                    optional: true,
                },
                ScenarioStep::Fill {
                    selector: settings.email_selector.clone(),
                    value: format!("env:{}", EMAIL_ENV),
                    optional: true,
                },
                ScenarioStep::Fill {
                    selector: settings.password_selector.clone(),
                    value: format!("env:{}", PASSWORD_ENV),
                    optional: true,
                },
                ScenarioStep::Screenshot { name: "02_login_filled".into(), full_page: false },
                ScenarioStep::Click {
                    selector: settings.submit_selector.clone(),
                    timeout_ms: default_click_timeout(),
                    optional: true,
                },
                ScenarioStep::Sleep { ms: 5000 },
                ScenarioStep::Screenshot { name: "03_after_login".into(), full_page: false },
            ]);
        }

        steps.extend([
            ScenarioStep::Discover,
            ScenarioStep::Screenshot { name: "04_dashboard".into(), full_page: true },
        ]);

        Self {
            name: "flowbots-explore".to_string(),
            description: "Open the web app, log in when credentials exist, map the page".to_string(),
            steps,
        }
    }
}
