//! `cardsheet plan`: print sheet geometry for the selected records.

use anyhow::{Context, Result};
use clap::Args;
use cardsheet::{LayoutEngine, LayoutPlan, PageParams, Rarity, Side, classify};
use serde::Serialize;

use crate::cli::common::{FieldArgs, PageArgs, SelectionArgs};
use crate::cli::utils::{apply_selection, load_store};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    #[command(flatten)]
    pub page: PageArgs,
    #[command(flatten)]
    pub fields: FieldArgs,
    /// Emit the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    fingerprint: String,
    rarities: Vec<Rarity>,
    plan: &'a LayoutPlan,
}

pub fn handle(args: PlanArgs) -> Result<()> {
    let mut store = load_store(&args.selection)?;
    apply_selection(&mut store, &args.selection)?;

    let params: PageParams = args.page.into();
    let engine = LayoutEngine::new(params).context("invalid page parameters")?;
    let subset = store.selected_subset();
    let plan = engine.plan(subset.len());
    let fingerprint = plan.fingerprint().context("failed to fingerprint layout")?;

    let rarity_fields = args.fields.rarity();
    let rarities: Vec<Rarity> = subset
        .iter()
        .map(|record| classify(record, &rarity_fields))
        .collect();

    if args.json {
        let output = PlanOutput {
            fingerprint,
            rarities,
            plan: &plan,
        };
        let text = serde_json::to_string_pretty(&output).context("failed to serialise plan")?;
        println!("{}", text);
        return Ok(());
    }

    let grid = plan.grid;
    println!(
        "Grid: {} x {} ({} card(s) per sheet), batch size {}",
        grid.cards_per_row,
        grid.cards_per_col,
        grid.cards_per_sheet(),
        params.cards_per_batch
    );
    println!(
        "Records: {}  Batches: {}  Sheets: {}",
        subset.len(),
        plan.batch_count(),
        plan.sheets.len()
    );
    for sheet in &plan.sheets {
        let side = match sheet.side {
            Side::Front => "front",
            Side::Back => "back",
        };
        println!(
            "Sheet {} (batch {}, page {}, {}): {} card(s)",
            sheet.index + 1,
            sheet.batch + 1,
            sheet.page + 1,
            side,
            sheet.cells.len()
        );
        for cell in &sheet.cells {
            println!(
                "  #{:<4} row {} col {}  x={:.3} y={:.3}  {}",
                cell.sequence, cell.row, cell.column, cell.x, cell.y, rarities[cell.record]
            );
        }
    }
    println!("Fingerprint: {}", fingerprint);
    Ok(())
}
