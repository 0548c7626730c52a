//! Direct API Conversion Command

use anyhow::Result;
use clap::Args;

use crate::output::{print_info, print_list, print_success, TableDisplay};
use crate::Context;
use flowlab_common::{Direction, Platform, Tier};
use flowlab_e2e::{ConversionRecord, ConversionSession};

/// Directions converted when none are given
const DEFAULT_DIRECTIONS: [Direction; 2] = [
    Direction::new(Platform::UiPath, Platform::FlowBots),
    Direction::new(Platform::PowerAutomateDesktop, Platform::UiPath),
];

#[derive(Args)]
pub struct ConvertArgs {
    /// Directions given as SRC:TGT (repeatable)
    #[arg(short, long = "direction")]
    pub directions: Vec<Direction>,

    /// Artifacts per direction (defaults to runner.artifacts_per_direction)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Tier whose source artifacts are converted
    #[arg(short, long, default_value = "simple")]
    pub tier: Tier,
}

impl TableDisplay for ConversionRecord {
    fn headers() -> Vec<&'static str> {
        vec!["Test", "Source", "Target", "Status", "Job", "Result"]
    }

    fn row(&self) -> Vec<String> {
        let result = match (&self.output_file, &self.error) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(error)) => error.clone(),
            (None, None) => String::new(),
        };
        vec![
            self.test_id.clone(),
            self.source_platform.clone(),
            self.target_platform.clone(),
            self.status.to_string(),
            self.job_id.clone().unwrap_or_default(),
            result,
        ]
    }
}

pub async fn execute(args: ConvertArgs, ctx: &Context) -> Result<()> {
    let directions = if args.directions.is_empty() {
        DEFAULT_DIRECTIONS.to_vec()
    } else {
        args.directions
    };
    let limit = args.limit.unwrap_or(ctx.config.runner.artifacts_per_direction);

    let session = ConversionSession::from_config(&ctx.config)?;
    let summary = session.run(&directions, args.tier, limit).await?;

    print_list(&summary.records, ctx.format);
    for (status, count) in &summary.counts {
        print_info(&format!("{}: {}", status, count));
    }
    print_success(&format!("Results saved to {}", summary.results_file.display()));
    Ok(())
}
