//! Inventory and Matrix Commands

use anyhow::Result;
use serde::Serialize;

use crate::output::{print_list, TableDisplay};
use crate::Context;
use flowlab_common::layout::InventoryEntry;
use flowlab_common::{run_test_id, CaseId, Direction, Tier, CONVERSION_MATRIX};

impl TableDisplay for InventoryEntry {
    fn headers() -> Vec<&'static str> {
        vec!["Platform", "Tier", "Artifacts"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.platform.display_name().to_string(),
            self.tier.label().to_string(),
            self.count.to_string(),
        ]
    }
}

#[derive(Serialize)]
pub struct DirectionDisplay {
    #[serde(flatten)]
    pub direction: Direction,
    pub api_supported: bool,
    pub first_test: String,
}

impl TableDisplay for DirectionDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Source", "Target", "API", "First Test"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.direction.source.display_name().to_string(),
            self.direction.target.display_name().to_string(),
            if self.api_supported { "✓" } else { "✗" }.to_string(),
            self.first_test.clone(),
        ]
    }
}

pub fn inventory(ctx: &Context) -> Result<()> {
    let entries = ctx.config.layout().inventory()?;
    print_list(&entries, ctx.format);
    Ok(())
}

pub fn matrix(ctx: &Context) {
    let first = Tier::Simple.cases().next();
    let rows: Vec<DirectionDisplay> = CONVERSION_MATRIX
        .iter()
        .map(|&direction| DirectionDisplay {
            direction,
            api_supported: direction.api_supported(),
            first_test: first
                .map(|case: CaseId| run_test_id(Tier::Simple, direction, case))
                .unwrap_or_default(),
        })
        .collect();
    print_list(&rows, ctx.format);
}
