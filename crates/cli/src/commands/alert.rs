//! Alert Commands

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;

use crate::output::{print_item, print_success, print_warning, TableDisplay};
use crate::Context;
use flowlab_common::{Alerter, Priority, ResourceSnapshot};

#[derive(Subcommand)]
pub enum AlertCommands {
    /// Send an alert
    Send {
        /// Message text
        message: String,

        /// Priority (info, medium, high, critical)
        #[arg(short, long, default_value = "info")]
        priority: Priority,
    },

    /// Sample host resources and alert when a threshold is crossed
    Resources,

    /// Send a test alert
    Test,
}

#[derive(Serialize)]
pub struct ResourceDisplay {
    #[serde(flatten)]
    pub snapshot: ResourceSnapshot,
    pub critical: Option<String>,
}

impl TableDisplay for ResourceDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["CPU", "Memory", "Disk Free", "Status"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            format!("{:.1}%", self.snapshot.cpu_percent),
            format!("{:.1}%", self.snapshot.memory_percent),
            format!("{:.1}GB", self.snapshot.disk_free_gb),
            self.critical.clone().unwrap_or_else(|| "OK".to_string()),
        ]
    }
}

pub async fn execute(cmd: AlertCommands, ctx: &Context) -> Result<()> {
    let alert = &ctx.config.alert;
    if !alert.has_credentials() {
        print_warning("Twilio credentials not configured; alerts are only logged");
    }
    let alerter = Alerter::from_config(alert);

    match cmd {
        AlertCommands::Send { message, priority } => {
            deliver(alerter.send(priority, &message).await)?;
        }

        AlertCommands::Resources => {
            let snapshot = ResourceSnapshot::capture(ctx.config.layout().root()).await;
            let critical = snapshot.critical_message();
            print_item(&ResourceDisplay { snapshot, critical: critical.clone() }, ctx.format);
            if critical.is_some() {
                deliver(alerter.send_resource_alert(&snapshot).await)?;
            }
        }

        AlertCommands::Test => {
            deliver(alerter.send(Priority::Info, "Alert system test").await)?;
        }
    }

    Ok(())
}

fn deliver(sent: bool) -> Result<()> {
    if !sent {
        bail!("Alert delivery failed");
    }
    print_success("Alert sent");
    Ok(())
}
