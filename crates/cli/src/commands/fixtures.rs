//! Fixture Commands

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;

use crate::output::{print_list, print_success, print_warning, TableDisplay};
use crate::Context;
use flowlab_common::{Platform, Tier};
use flowlab_fixtures::{generator_for, simple_cases, FixtureCase, TargetPaths};

#[derive(Subcommand)]
pub enum FixturesCommands {
    /// Write Simple tier packages into artifacts_source/<platform>/simple
    Generate {
        /// Platform to generate (uipath, blueprism, pad); all when omitted
        #[arg(short, long)]
        platform: Vec<Platform>,

        /// Root path embedded in the workflows (defaults to lab.target_root)
        #[arg(long)]
        target_root: Option<String>,
    },

    /// List the fixture catalog
    List,
}

#[derive(Serialize)]
pub struct GenerationDisplay {
    pub platform: Platform,
    pub created: usize,
    pub failed: usize,
    pub output_dir: PathBuf,
}

impl TableDisplay for GenerationDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Platform", "Created", "Failed", "Directory"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.platform.display_name().to_string(),
            self.created.to_string(),
            self.failed.to_string(),
            self.output_dir.display().to_string(),
        ]
    }
}

#[derive(Serialize)]
pub struct CaseDisplay {
    pub id: String,
    pub project: String,
    pub description: String,
}

impl From<FixtureCase> for CaseDisplay {
    fn from(case: FixtureCase) -> Self {
        Self {
            id: case.id.to_string(),
            project: case.project_name(),
            description: case.description.to_string(),
        }
    }
}

impl TableDisplay for CaseDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Project", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.id.clone(), self.project.clone(), self.description.clone()]
    }
}

const FIXTURE_PLATFORMS: [Platform; 3] = [
    Platform::UiPath,
    Platform::BluePrism,
    Platform::PowerAutomateDesktop,
];

pub fn execute(cmd: FixturesCommands, ctx: &Context) -> Result<()> {
    match cmd {
        FixturesCommands::Generate { platform, target_root } => {
            let paths = TargetPaths::new(target_root.unwrap_or_else(|| ctx.config.lab.target_root.clone()));
            let layout = ctx.config.layout();
            let platforms = if platform.is_empty() {
                FIXTURE_PLATFORMS.to_vec()
            } else {
                platform
            };

            let mut rows = Vec::new();
            for platform in platforms {
                let Some(generator) = generator_for(platform, paths.clone()) else {
                    bail!("No fixture generator for {}", platform.display_name());
                };
                let report = generator.generate_all(&layout.source_dir(platform, Tier::Simple))?;
                for (case, error) in &report.failures {
                    print_warning(&format!("{} {}: {}", platform.display_name(), case, error));
                }
                rows.push(GenerationDisplay {
                    platform,
                    created: report.created.len(),
                    failed: report.failures.len(),
                    output_dir: report.output_dir,
                });
            }

            let created: usize = rows.iter().map(|r| r.created).sum();
            print_success(&format!("Generated {} fixture packages", created));
            print_list(&rows, ctx.format);
        }

        FixturesCommands::List => {
            let cases: Vec<CaseDisplay> = simple_cases().into_iter().map(CaseDisplay::from).collect();
            print_list(&cases, ctx.format);
        }
    }

    Ok(())
}
