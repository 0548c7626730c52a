//! Browser Exploration Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::output::{print_banner, print_document, print_error, print_success, OutputFormat};
use crate::Context;
use flowlab_e2e::explorer::save_report;
use flowlab_e2e::{E2eError, ExplorationReport, Explorer, Scenario};

#[derive(Args)]
pub struct ExploreArgs {
    /// Scenario file or directory; the built-in login scenario when omitted
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

pub async fn execute(args: ExploreArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    let layout = config.layout();

    let mut settings = config.explorer.clone();
    if args.headed {
        settings.headless = false;
    }
    let explorer = Explorer::new(settings, &config.api.app_url, layout.screenshots_dir(), layout.root());

    let scenarios = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => vec![explorer.default_scenario()],
    };

    for scenario in &scenarios {
        let report = match explorer.run(scenario).await {
            Ok(report) => report,
            Err(E2eError::PlaywrightNotFound) => {
                print_error("Playwright not found. Install it with: npm install playwright && npx playwright install chromium");
                return Err(E2eError::PlaywrightNotFound.into());
            }
            Err(e) => return Err(e.into()),
        };
        let saved = save_report(&report, &layout.screenshots_dir())?;

        match ctx.format {
            OutputFormat::Table | OutputFormat::Plain => print_summary(&scenario.name, &report),
            _ => print_document(&report, ctx.format),
        }
        print_success(&format!("Report saved to {}", saved.display()));
    }

    Ok(())
}

fn print_summary(name: &str, report: &ExplorationReport) {
    print_banner(&format!("Exploration: {}", name));
    println!("{}  {}", "Title:".bold(), report.title);
    println!("{}    {}", "URL:".bold(), report.url);

    println!();
    println!("{}", "Steps".bold());
    for step in &report.steps {
        let mark = if step.ok { "✓".green() } else { "✗".red() };
        match &step.error {
            Some(error) => println!("   {} {} ({})", mark, step.name, error.dimmed()),
            None => println!("   {} {}", mark, step.name),
        }
    }

    if let Some(found) = &report.discovered {
        println!();
        println!("{}", "Discovered".bold());
        println!("   Inputs:      {}", found.inputs.len());
        println!("   Buttons:     {}", found.buttons.len());
        println!("   Links:       {}", found.links.len());
        println!("   File inputs: {}", found.file_inputs.to_string().cyan());
        for button in found.buttons.iter().filter(|b| !b.text.is_empty()).take(10) {
            println!("     • {}", button.text);
        }
    }

    if !report.screenshots.is_empty() {
        println!();
        println!("{}", "Screenshots".bold());
        for shot in &report.screenshots {
            println!("   {}", shot.display());
        }
    }

    if let Some(error) = &report.error {
        println!();
        println!("{} {}", "Stopped:".red().bold(), error);
    }
}
