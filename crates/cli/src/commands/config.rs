//! Configuration Commands

use anyhow::{bail, Result};
use clap::Subcommand;

use crate::output::{print_document, print_success, OutputFormat};
use crate::Context;
use flowlab_common::LabConfig;

const MASK: &str = "********";

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration with secrets masked
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Copy of the configuration safe to print
pub fn redacted(config: &LabConfig) -> LabConfig {
    let mut shown = config.clone();
    let mask = |value: &mut Option<String>| {
        if value.is_some() {
            *value = Some(MASK.to_string());
        }
    };
    mask(&mut shown.api.api_key);
    mask(&mut shown.alert.auth_token);
    mask(&mut shown.explorer.password);
    shown
}

pub fn execute(cmd: ConfigCommands, ctx: &Context) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let shown = redacted(&ctx.config);
            match ctx.format {
                OutputFormat::Table | OutputFormat::Plain => {
                    println!("# {}", ctx.config_path.display());
                    println!("{}", toml::to_string_pretty(&shown)?);
                }
                _ => print_document(&shown, ctx.format),
            }
        }

        ConfigCommands::Init { force } => {
            if ctx.config_path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", ctx.config_path.display());
            }
            LabConfig::default().save(&ctx.config_path)?;
            print_success(&format!("Wrote {}", ctx.config_path.display()));
        }
    }

    Ok(())
}
