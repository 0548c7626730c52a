//! API Probe Command

use anyhow::Result;
use serde::Serialize;

use crate::output::{print_document, print_list, print_success, OutputFormat, TableDisplay};
use crate::Context;
use flowlab_common::ConversionClient;
use flowlab_e2e::probe::{run_probe, save_report, EndpointProbe};

#[derive(Serialize)]
pub struct EndpointDisplay {
    pub endpoint: String,
    pub status: Option<u16>,
    pub detail: String,
}

impl EndpointDisplay {
    fn new(endpoint: &str, probe: &EndpointProbe) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            status: probe.status,
            detail: probe
                .error
                .clone()
                .or_else(|| probe.response.clone())
                .unwrap_or_default()
                .replace('\n', " "),
        }
    }
}

impl TableDisplay for EndpointDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Endpoint", "Status", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.endpoint.clone(),
            self.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            self.detail.chars().take(80).collect(),
        ]
    }
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let client = ConversionClient::new(&ctx.config.api)?;
    let report = run_probe(&client, &ctx.config.api.app_url).await;
    let path = save_report(&report, &ctx.config.layout().api_tests_dir())?;

    match ctx.format {
        OutputFormat::Table | OutputFormat::Plain => {
            let mut rows = vec![
                EndpointDisplay::new("/health", &report.health),
                EndpointDisplay::new("/convert/platforms", &report.platforms),
            ];
            rows.extend(
                report
                    .endpoints
                    .iter()
                    .map(|(endpoint, probe)| EndpointDisplay::new(endpoint, probe)),
            );
            rows.push(EndpointDisplay {
                endpoint: report.app_url.clone(),
                status: report.app.status,
                detail: match &report.app.error {
                    Some(error) => error.clone(),
                    None => format!("keywords: {}", report.app.keywords.join(", ")),
                },
            });
            print_list(&rows, ctx.format);
        }
        _ => print_document(&report, ctx.format),
    }

    print_success(&format!("Report saved to {}", path.display()));
    Ok(())
}
