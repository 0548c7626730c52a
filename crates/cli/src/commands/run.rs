//! Matrix Run Command

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;

use crate::output::{print_banner, print_list, print_warning, TableDisplay};
use crate::Context;
use flowlab_common::{Alerter, Direction, Tier, CONVERSION_MATRIX};
use flowlab_e2e::{AgentExecutor, ApiExecutor, ConversionSession, RunOptions, TestExecutor, TestRunner, TierSummary};

/// How each matrix test is carried out
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum ExecutorKind {
    /// Spawn the coding agent with a per-test prompt
    #[default]
    Agent,
    /// Convert the source artifact through the conversion API
    Api,
}

#[derive(Args)]
pub struct RunArgs {
    /// Run a single tier; every tier when omitted
    #[arg(short, long)]
    pub tier: Option<Tier>,

    /// Test executor
    #[arg(short, long, value_enum, default_value_t = ExecutorKind::Agent)]
    pub executor: ExecutorKind,

    /// Skip tests that passed in a previous run
    #[arg(long)]
    pub resume: bool,

    /// Only the first N cases of each tier
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Restrict to directions given as SRC:TGT (repeatable)
    #[arg(short, long = "direction")]
    pub directions: Vec<Direction>,

    /// Skip the host resource check after each tier
    #[arg(long)]
    pub no_monitor: bool,
}

impl TableDisplay for TierSummary {
    fn headers() -> Vec<&'static str> {
        vec!["Tier", "Total", "Passed", "Failed", "Pass Rate", "Resumed"]
    }

    fn row(&self) -> Vec<String> {
        let rate = format!("{:.1}%", self.pass_rate);
        let rate = if self.failed == 0 { rate.green() } else { rate.yellow() };
        vec![
            self.tier.label().to_string(),
            self.total.to_string(),
            self.passed.to_string(),
            self.failed.to_string(),
            rate.to_string(),
            self.resumed.to_string(),
        ]
    }
}

pub async fn execute(args: RunArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    let layout = config.layout();
    layout.ensure_dirs()?;

    for direction in &args.directions {
        if !CONVERSION_MATRIX.contains(direction) {
            print_warning(&format!("{} is not part of the conversion matrix; ignored", direction));
        }
    }

    let executor: Arc<dyn TestExecutor> = match args.executor {
        ExecutorKind::Agent => Arc::new(AgentExecutor::new(
            config.agent.clone(),
            config.lab.target_root.clone(),
        )),
        ExecutorKind::Api => Arc::new(ApiExecutor::new(ConversionSession::from_config(config)?)),
    };

    let options = RunOptions {
        resume: args.resume,
        limit: args.limit,
        directions: (!args.directions.is_empty()).then_some(args.directions),
        monitor_resources: !args.no_monitor,
    };
    let mut runner = TestRunner::new(
        executor.clone(),
        Alerter::from_config(&config.alert),
        layout.runs_dir(),
        &config.runner,
    )
    .with_options(options);

    if ctx.format == crate::output::OutputFormat::Table {
        let tiers = args.tier.map(|t| vec![t]).unwrap_or_else(|| Tier::ALL.to_vec());
        print_banner(&format!(
            "FlowBots E2E run: {} tests via {} executor",
            runner.planned_tests(&tiers),
            executor.name()
        ));
    }

    let summaries = match args.tier {
        Some(tier) => vec![runner.run_tier(tier).await?],
        None => runner.run_all().await?,
    };

    print_list(&summaries, ctx.format);
    Ok(())
}
