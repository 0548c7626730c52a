//! API discovery probe
//!
//! Hits the known and candidate endpoints of the conversion service plus the
//! web app, recording what answers. Individual failures are recorded, never
//! fatal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::E2eResult;
use flowlab_common::client::truncate_chars;
use flowlab_common::ConversionClient;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const ALT_TIMEOUT: Duration = Duration::from_secs(10);

/// Candidate endpoints checked for a status code only
pub const ALTERNATIVE_ENDPOINTS: [&str; 5] =
    ["/api/health", "/api/v1/platforms", "/api/convert", "/v1/convert", "/"];

/// Words looked for in the web app's landing page
pub const APP_KEYWORDS: [&str; 4] = ["convert", "upload", "uipath", "power automate"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointProbe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppProbe {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<usize>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub timestamp: DateTime<Local>,
    pub base_url: String,
    pub app_url: String,
    pub health: EndpointProbe,
    pub platforms: EndpointProbe,
    pub app: AppProbe,
    pub endpoints: BTreeMap<String, EndpointProbe>,
}

async fn probe(client: &ConversionClient, path: &str, timeout: Duration, keep: usize) -> EndpointProbe {
    match client.get_raw(path, timeout).await {
        Ok(resp) => {
            info!("  {}: {}", path, resp.status);
            EndpointProbe {
                status: Some(resp.status),
                response: (keep > 0).then(|| truncate_chars(&resp.body, keep)),
                error: None,
            }
        }
        Err(e) => {
            warn!("  {}: Error - {}", path, e);
            EndpointProbe {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}

/// Which of [`APP_KEYWORDS`] appear in a page, case-insensitively
pub fn find_keywords(page: &str) -> Vec<String> {
    let lower = page.to_lowercase();
    APP_KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .map(|k| k.to_string())
        .collect()
}

/// Probe the API and app
pub async fn run_probe(client: &ConversionClient, app_url: &str) -> ProbeReport {
    info!("Probing conversion API at {}", client.base_url());

    let health = probe(client, "/health", PROBE_TIMEOUT, 500).await;
    let platforms = probe(client, "/convert/platforms", PROBE_TIMEOUT, 1000).await;

    let app = match client.get_raw(app_url, PROBE_TIMEOUT).await {
        Ok(resp) => {
            let keywords = find_keywords(&resp.body);
            info!(
                "  {}: {} ({} bytes, found {:?})",
                app_url,
                resp.status,
                resp.body.len(),
                keywords
            );
            AppProbe {
                status: Some(resp.status),
                content_length: Some(resp.body.len()),
                keywords,
                error: None,
            }
        }
        Err(e) => {
            warn!("  {}: Error - {}", app_url, e);
            AppProbe {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    };

    let mut endpoints = BTreeMap::new();
    for endpoint in ALTERNATIVE_ENDPOINTS {
        endpoints.insert(endpoint.to_string(), probe(client, endpoint, ALT_TIMEOUT, 0).await);
    }

    ProbeReport {
        timestamp: Local::now(),
        base_url: client.base_url().to_string(),
        app_url: app_url.to_string(),
        health,
        platforms,
        app,
        endpoints,
    }
}

/// Save a report as `api_test_{unix}.json` in `dir`
pub fn save_report(report: &ProbeReport, dir: &Path) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("api_test_{}.json", Utc::now().timestamp()));
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
    info!("Results saved to: {}", path.display());
    Ok(path)
}
