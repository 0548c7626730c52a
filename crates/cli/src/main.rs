//! FlowLab CLI - Main Entry Point
//!
//! Generates fixture packages, drives conversions through the FlowBots API,
//! runs the conversion matrix and explores the web app.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{alert, api, config, convert, explore, fixtures, lab, probe, run};
use flowlab_common::LabConfig;

/// FlowLab - RPA workflow conversion test lab
#[derive(Parser)]
#[command(name = "flowlab")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, env = "FLOWLAB_CONFIG", default_value_os_t = flowlab_common::default_config_path(), global = true)]
    config: PathBuf,

    /// Lab root (overrides the configuration file)
    #[arg(long, env = "FLOWLAB_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Conversion API key
    #[arg(long, env = "FLOWBOTS_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and list source fixtures
    #[command(subcommand)]
    Fixtures(fixtures::FixturesCommands),

    /// Call the conversion API directly
    #[command(subcommand)]
    Api(api::ApiCommands),

    /// Run the conversion matrix
    Run(run::RunArgs),

    /// Convert source artifacts through the API and record the results
    Convert(convert::ConvertArgs),

    /// Probe API endpoints and the web app
    Probe,

    /// Explore the web app in a browser
    Explore(explore::ExploreArgs),

    /// Send and test SMS alerts
    #[command(subcommand)]
    Alert(alert::AlertCommands),

    /// Show or create the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Count source artifacts per platform and tier
    Inventory,

    /// Show the conversion matrix
    Matrix,
}

/// Everything a command needs
pub struct Context {
    pub config: LabConfig,
    pub config_path: PathBuf,
    pub format: output::OutputFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let mut config = LabConfig::load_with_env(&cli.config)?;
    tracing::debug!("Configuration: {}", cli.config.display());
    if let Some(root) = cli.root {
        config.lab.root = root;
    }
    if let Some(key) = cli.api_key.filter(|k| !k.is_empty()) {
        config.api.api_key = Some(key);
    }

    let ctx = Context {
        config,
        config_path: cli.config,
        format: cli.format,
    };

    match cli.command {
        Commands::Fixtures(cmd) => fixtures::execute(cmd, &ctx)?,
        Commands::Api(cmd) => api::execute(cmd, &ctx).await?,
        Commands::Run(args) => run::execute(args, &ctx).await?,
        Commands::Convert(args) => convert::execute(args, &ctx).await?,
        Commands::Probe => probe::execute(&ctx).await?,
        Commands::Explore(args) => explore::execute(args, &ctx).await?,
        Commands::Alert(cmd) => alert::execute(cmd, &ctx).await?,
        Commands::Config(cmd) => config::execute(cmd, &ctx)?,
        Commands::Inventory => lab::inventory(&ctx)?,
        Commands::Matrix => lab::matrix(&ctx),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use flowlab_common::{Direction, Platform, Tier};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "flowlab",
            "run",
            "--tier",
            "moderate",
            "--executor",
            "api",
            "--resume",
            "--limit",
            "3",
            "--direction",
            "uipath:flowbots",
            "--direction",
            "pad:uipath",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.format, output::OutputFormat::Json);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.tier, Some(Tier::Moderate));
                assert_eq!(args.executor, run::ExecutorKind::Api);
                assert!(args.resume);
                assert_eq!(args.limit, Some(3));
                assert_eq!(
                    args.directions,
                    vec![
                        Direction::new(Platform::UiPath, Platform::FlowBots),
                        Direction::new(Platform::PowerAutomateDesktop, Platform::UiPath),
                    ]
                );
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_platform() {
        assert!(Cli::try_parse_from(["flowlab", "fixtures", "generate", "--platform", "zapier"]).is_err());
        assert!(Cli::try_parse_from(["flowlab", "convert", "--direction", "uipath:uipath"]).is_err());
    }

    #[test]
    fn test_parse_alert_send() {
        let cli = Cli::try_parse_from(["flowlab", "alert", "send", "disk full", "--priority", "critical"]).unwrap();
        match cli.command {
            Commands::Alert(alert::AlertCommands::Send { message, priority }) => {
                assert_eq!(message, "disk full");
                assert_eq!(priority, flowlab_common::Priority::Critical);
            }
            _ => panic!("expected alert send"),
        }
    }
}
