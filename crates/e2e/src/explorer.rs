//! Browser exploration through Playwright
//!
//! A scenario is rendered into one node script. The script records every
//! step and prints a single JSON report line that is parsed back here.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::scenario::{Scenario, ScenarioStep, EMAIL_ENV, PASSWORD_ENV};
use flowlab_common::config::ExplorerSettings;

/// Prefix of the report line printed by the script
const REPORT_MARKER: &str = "FLOWLAB_REPORT ";

/// Upper bound for one scenario run
const RUN_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub name: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredInput {
    pub tag: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredButton {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredLink {
    pub text: String,
    pub href: String,
}

/// Elements found on the page by a `discover` step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    #[serde(default)]
    pub inputs: Vec<DiscoveredInput>,
    #[serde(default)]
    pub buttons: Vec<DiscoveredButton>,
    #[serde(default)]
    pub links: Vec<DiscoveredLink>,
    #[serde(default)]
    pub file_inputs: usize,
}

/// What one scenario run saw
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplorationReport {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub screenshots: Vec<PathBuf>,
    #[serde(default)]
    pub steps: Vec<StepOutcome>,
    #[serde(default)]
    pub discovered: Option<Discovery>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExplorationReport {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// JavaScript string literal
fn js(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Fill values: `env:NAME` reads the browser process environment
fn js_value(value: &str) -> String {
    match value.strip_prefix("env:") {
        Some(name) => format!("(process.env[{}] || '')", js(name)),
        None => js(value),
    }
}

fn browser_launcher(name: &str) -> &'static str {
    match name.to_lowercase().as_str() {
        "firefox" => "firefox",
        "webkit" => "webkit",
        _ => "chromium",
    }
}

const SCRIPT_HELPERS: &str = r#"
  const shot = async (name, fullPage) => {
    const file = path.join(screenshotDir, `${name}_${Math.floor(Date.now() / 1000)}.png`);
    await page.screenshot({ path: file, fullPage });
    report.screenshots.push(file);
  };
  const step = async (name, optional, body) => {
    try {
      await body();
      report.steps.push({ name, ok: true });
    } catch (error) {
      report.steps.push({ name, ok: false, error: error.message });
      if (!optional) throw error;
    }
  };
  const discover = () => page.evaluate(() => {
    const text = (el) => (el.innerText || el.value || el.getAttribute('aria-label') || '').trim().slice(0, 80);
    const all = (selector) => Array.from(document.querySelectorAll(selector)).slice(0, 50);
    return {
      inputs: all('input, textarea, select').map((el) => ({
        tag: el.tagName.toLowerCase(),
        type: el.getAttribute('type') || '',
        name: el.getAttribute('name') || '',
        id: el.id || '',
        placeholder: el.getAttribute('placeholder') || '',
      })),
      buttons: all('button, [role="button"], input[type="submit"]').map((el) => ({
        text: text(el),
        type: el.getAttribute('type') || '',
      })),
      links: all('a[href]').map((el) => ({ text: text(el), href: el.href })),
      fileInputs: document.querySelectorAll('input[type="file"]').length,
    };
  });
"#;

const SCRIPT_FOOTER: &str = r#"
  } catch (error) {
    report.error = error.message;
    try { await shot('error', false); } catch (_) {}
  } finally {
    try {
      report.title = await page.title();
      report.url = page.url();
    } catch (_) {}
    console.log('FLOWLAB_REPORT ' + JSON.stringify(report));
    await browser.close();
  }
})();
"#;

/// Runs exploration scenarios in a headless browser
#[derive(Debug, Clone)]
pub struct Explorer {
    settings: ExplorerSettings,
    app_url: String,
    screenshots_dir: PathBuf,
    work_dir: PathBuf,
}

impl Explorer {
    /// `work_dir` is where the script runs from; Playwright must be
    /// resolvable from there (or globally)
    pub fn new(
        settings: ExplorerSettings,
        app_url: impl Into<String>,
        screenshots_dir: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            app_url: app_url.into(),
            screenshots_dir: screenshots_dir.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn default_scenario(&self) -> Scenario {
        Scenario::default_login(&self.app_url, &self.settings)
    }

    /// Render a scenario into a node script
    pub fn build_script(&self, scenario: &Scenario) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"// {name}
const {{ chromium, firefox, webkit }} = require('playwright');
const path = require('path');

(async () => {{
  const report = {{ title: '', url: '', screenshots: [], steps: [], discovered: null, error: null }};
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};
  const screenshotDir = {screenshot_dir};
"#,
            name = scenario.name.replace(['\n', '\r', '\u{2028}', '\u{2029}'], " "),
            browser = browser_launcher(&self.settings.browser),
            headless = self.settings.headless,
            width = self.settings.viewport_width,
            height = self.settings.viewport_height,
            base_url = js(&self.app_url),
            screenshot_dir = js(&self.screenshots_dir.to_string_lossy()),
        ));
        script.push_str(SCRIPT_HELPERS);
        script.push_str("\n  try {\n");

        for (i, step) in scenario.steps.iter().enumerate() {
            script.push_str(&format!(
                "    // Step {}\n    await step({}, {}, async () => {{\n{}\n    }});\n",
                i + 1,
                js(&step.label()),
                step.is_optional(),
                step_to_js(step)
            ));
        }

        script.push_str(SCRIPT_FOOTER);
        script
    }

    /// Verify node can load Playwright from the working directory
    pub async fn check_playwright(&self) -> E2eResult<()> {
        let status = Command::new("node")
            .args(["-e", "require.resolve('playwright')"])
            .current_dir(&self.work_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Run a scenario and return what the browser saw
    pub async fn run(&self, scenario: &Scenario) -> E2eResult<ExplorationReport> {
        self.check_playwright().await?;
        std::fs::create_dir_all(&self.screenshots_dir)?;
        std::fs::create_dir_all(&self.work_dir)?;

        let script_file = tempfile::Builder::new()
            .prefix("flowlab_explore_")
            .suffix(".js")
            .tempfile_in(&self.work_dir)?;
        std::fs::write(script_file.path(), self.build_script(scenario))?;

        info!("Running scenario '{}' ({} steps)", scenario.name, scenario.steps.len());
        debug!("Playwright script: {}", script_file.path().display());

        let mut cmd = Command::new("node");
        cmd.arg(script_file.path())
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(email) = &self.settings.email {
            cmd.env(EMAIL_ENV, email);
        }
        if let Some(password) = &self.settings.password {
            cmd.env(PASSWORD_ENV, password);
        }

        let output = tokio::time::timeout(RUN_TIMEOUT, cmd.output())
            .await
            .map_err(|_| E2eError::Playwright(format!("scenario exceeded {}s", RUN_TIMEOUT.as_secs())))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_report(&stdout) {
            Some(report) => {
                if let Some(error) = &report.error {
                    warn!("Scenario '{}' stopped: {}", scenario.name, error);
                }
                Ok(report)
            }
            None => Err(E2eError::Playwright(format!(
                "no report from script:\nstdout: {}\nstderr: {}",
                stdout,
                String::from_utf8_lossy(&output.stderr)
            ))),
        }
    }
}

fn step_to_js(step: &ScenarioStep) -> String {
    match step {
        ScenarioStep::Navigate { url } => format!(
            "      await page.goto(new URL({}, baseUrl).toString(), {{ waitUntil: 'load' }});",
            js(url)
        ),
        ScenarioStep::Fill { selector, value, .. } => format!(
            "      await page.fill({}, {});",
            js(selector),
            js_value(value)
        ),
        ScenarioStep::Click { selector, timeout_ms, .. } => format!(
            "      await page.click({}, {{ timeout: {} }});",
            js(selector),
            timeout_ms
        ),
        ScenarioStep::Wait { selector, timeout_ms, .. } => format!(
            "      await page.waitForSelector({}, {{ state: 'visible', timeout: {} }});",
            js(selector),
            timeout_ms
        ),
        ScenarioStep::Sleep { ms } => format!("      await page.waitForTimeout({});", ms),
        ScenarioStep::Screenshot { name, full_page } => {
            format!("      await shot({}, {});", js(name), full_page)
        }
        ScenarioStep::Discover => "      report.discovered = await discover();".to_string(),
        ScenarioStep::Log { message } => format!("      console.error('[SCENARIO] ' + {});", js(message)),
    }
}

/// Last report line in the script output
pub fn parse_report(stdout: &str) -> Option<ExplorationReport> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(REPORT_MARKER))
        .and_then(|json| match serde_json::from_str(json) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Unreadable exploration report: {}", e);
                None
            }
        })
}

/// Save a report next to the screenshots
pub fn save_report(report: &ExplorationReport, dir: &Path) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("exploration_{}.json", chrono::Utc::now().timestamp()));
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explorer(settings: ExplorerSettings) -> Explorer {
        Explorer::new(settings, "https://app.example", "/lab/screenshots", "/lab")
    }

    #[test]
    fn test_script_escapes_literals() {
        let scenario = Scenario {
            name: "quotes".into(),
            description: String::new(),
            steps: vec![
                ScenarioStep::Fill {
                    selector: "input[name='q']".into(),
                    value: "it's \"quoted\"\n".into(),
                    optional: false,
                },
                ScenarioStep::Log { message: "done'); process.exit(1); ('".into() },
            ],
        };
        let script = explorer(ExplorerSettings::default()).build_script(&scenario);
        assert!(script.contains(r#"await page.fill("input[name='q']", "it's \"quoted\"\n");"#));
        assert!(script.contains(r#"console.error('[SCENARIO] ' + "done'); process.exit(1); ('");"#));
        assert!(script.contains(r#"const baseUrl = "https://app.example";"#));
        assert!(script.contains("chromium.launch({ headless: true })"));
        assert!(script.contains("viewport: { width: 1920, height: 1080 }"));
    }

    #[test]
    fn test_scenario_name_stays_in_comment() {
        let scenario = Scenario {
            name: "login\rprocess.exit(1)\u{2028}process.exit(2)\u{2029}x".into(),
            description: String::new(),
            steps: Vec::new(),
        };
        let script = explorer(ExplorerSettings::default()).build_script(&scenario);
        assert!(!script.contains(['\r', '\u{2028}', '\u{2029}']));
        assert_eq!(
            script.lines().next(),
            Some("// login process.exit(1) process.exit(2) x")
        );
    }

    #[test]
    fn test_default_scenario_reads_credentials_from_env() {
        let settings = ExplorerSettings {
            email: Some("qa@example.com".into()),
            password: Some("hunter2".into()),
            browser: "Firefox".into(),
            ..Default::default()
        };
        let explorer = explorer(settings);
        let script = explorer.build_script(&explorer.default_scenario());

        assert!(!script.contains("hunter2"));
        assert!(script.contains(r#"(process.env["FLOWBOTS_PASSWORD"] || '')"#));
        assert!(script.contains("firefox.launch"));
        assert!(script.contains(r#"await shot("01_landing", false);"#));
        assert!(script.contains(r#"await step("fill:input[type='password']", true, async () => {"#));
        assert!(script.contains("report.discovered = await discover();"));
    }

    #[test]
    fn test_parse_report() {
        let stdout = "[SCENARIO] noise\n\
            FLOWLAB_REPORT {\"title\":\"FlowBots\",\"url\":\"https://app.example/login\",\
            \"screenshots\":[\"/lab/screenshots/01_landing_1700000000.png\"],\
            \"steps\":[{\"name\":\"discover\",\"ok\":true}],\
            \"discovered\":{\"inputs\":[{\"tag\":\"input\",\"type\":\"file\",\"name\":\"\",\"id\":\"up\",\"placeholder\":\"\"}],\
            \"buttons\":[],\"links\":[{\"text\":\"Convert\",\"href\":\"https://app.example/convert\"}],\"fileInputs\":1},\
            \"error\":null}\n";
        let report = parse_report(stdout).unwrap();
        assert!(report.success());
        assert_eq!(report.title, "FlowBots");
        let discovered = report.discovered.unwrap();
        assert_eq!(discovered.file_inputs, 1);
        assert_eq!(discovered.inputs[0].kind, "file");
        assert_eq!(discovered.links[0].text, "Convert");

        assert!(parse_report("plain output\n").is_none());
    }
}
