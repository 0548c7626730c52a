//! Conversion API Commands

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Subcommand;

use crate::output::{print_document, print_error, print_info, print_success, print_warning};
use crate::Context;
use flowlab_common::{ConversionClient, ConvertOptions, JobOutcome, Platform};

#[derive(Subcommand)]
pub enum ApiCommands {
    /// Check API health
    Health,

    /// Submit a conversion job
    Convert {
        /// Source package
        file: PathBuf,

        /// Source platform
        #[arg(short, long)]
        source: Platform,

        /// Target platform
        #[arg(short, long)]
        target: Platform,

        /// Poll until the job finishes and download the result
        #[arg(long)]
        wait: bool,

        /// Download directory used with --wait
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Show a job's status
    Status {
        /// Job ID
        job_id: String,
    },

    /// Poll a job until it completes, fails or times out
    Wait {
        /// Job ID
        job_id: String,

        /// Timeout in seconds (defaults to api.job_timeout_secs)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Download a job's converted files as a zip
    Download {
        /// Job ID
        job_id: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Request a migration assessment
    Assess {
        /// Source package
        file: PathBuf,

        /// Source platform
        #[arg(short, long)]
        source: Platform,

        /// Target platform
        #[arg(short, long)]
        target: Platform,
    },
}

pub async fn execute(cmd: ApiCommands, ctx: &Context) -> Result<()> {
    let api = &ctx.config.api;
    let client = ConversionClient::new(api)?;
    let poll_interval = Duration::from_secs(api.poll_interval_secs);

    match cmd {
        ApiCommands::Health => {
            let health = client.health_check().await?;
            print_document(&health, ctx.format);
        }

        ApiCommands::Convert { file, source, target, wait, output } => {
            let submitted = client
                .convert(&file, source, target, ConvertOptions::from(api))
                .await?;
            print_document(&submitted, ctx.format);

            if wait {
                let Some(job_id) = submitted.job_id else {
                    bail!("No job ID returned");
                };
                let timeout = Duration::from_secs(api.job_timeout_secs);
                wait_and_report(&client, &job_id, timeout, poll_interval, ctx).await?;
                match client.download_files(&job_id, &output).await? {
                    Some(path) => print_success(&format!("Downloaded {}", path.display())),
                    None => print_warning("No files available for download"),
                }
            }
        }

        ApiCommands::Status { job_id } => {
            let status = client.job_status(&job_id).await?;
            print_document(&status, ctx.format);
        }

        ApiCommands::Wait { job_id, timeout } => {
            let timeout = Duration::from_secs(timeout.unwrap_or(api.job_timeout_secs));
            wait_and_report(&client, &job_id, timeout, poll_interval, ctx).await?;
        }

        ApiCommands::Download { job_id, output } => match client.download_files(&job_id, &output).await? {
            Some(path) => print_success(&format!("Downloaded {}", path.display())),
            None => bail!("No files available for job {}", job_id),
        },

        ApiCommands::Assess { file, source, target } => {
            let report = client.assess(&file, source, target).await?;
            print_document(&report, ctx.format);
        }
    }

    Ok(())
}

async fn wait_and_report(
    client: &ConversionClient,
    job_id: &str,
    timeout: Duration,
    poll_interval: Duration,
    ctx: &Context,
) -> Result<()> {
    print_info(&format!("Waiting for job {} (timeout {}s)", job_id, timeout.as_secs()));
    match client.wait_for_job(job_id, timeout, poll_interval).await? {
        JobOutcome::Completed(status) => {
            print_success(&format!("Job {} completed", job_id));
            print_document(&status, ctx.format);
            Ok(())
        }
        JobOutcome::Failed(status) => {
            print_error(&format!(
                "Job {} failed: {}",
                job_id,
                status.error_message().unwrap_or_else(|| "Unknown error".to_string())
            ));
            print_document(&status, ctx.format);
            bail!("conversion job failed")
        }
        JobOutcome::TimedOut { waited, .. } => {
            bail!("Job {} did not complete within {}s", job_id, waited.as_secs())
        }
    }
}
