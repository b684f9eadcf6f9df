//! `cardsheet inspect`: report what was loaded and how each row scores.

use anyhow::{Context, Result};
use clap::Args;
use cardsheet::{Rarity, RarityScore, RecordStore, score};
use serde::Serialize;

use crate::cli::common::{FieldArgs, SelectionArgs};
use crate::cli::utils::{apply_selection, format_file_size, format_upload_date, load_store};

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    #[command(flatten)]
    pub fields: FieldArgs,
    /// Emit a JSON document instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct FileSummary<'a> {
    index: usize,
    name: &'a str,
    size: String,
    uploaded: String,
    selected: bool,
    rows: usize,
}

#[derive(Serialize)]
struct RowSummary<'a> {
    file: usize,
    row: usize,
    selected: bool,
    rarity: Rarity,
    score: RarityScore,
    fields: Vec<(&'a str, &'a str)>,
}

#[derive(Serialize)]
struct InspectReport<'a> {
    headers: &'a [String],
    files: Vec<FileSummary<'a>>,
    rows: Vec<RowSummary<'a>>,
    all_selected: bool,
    selected_count: usize,
}

pub fn handle(args: InspectArgs) -> Result<()> {
    let mut store = load_store(&args.selection)?;
    apply_selection(&mut store, &args.selection)?;
    let report = build_report(&store, &args.fields);

    if args.json {
        let text =
            serde_json::to_string_pretty(&report).context("failed to serialise inspect report")?;
        println!("{}", text);
        return Ok(());
    }

    println!("Columns: {}", report.headers.join(", "));
    println!("Files:");
    for file in &report.files {
        println!(
            "  {:>3} {} [{}] {}  {}  {} row(s){}",
            file.index,
            if file.selected { "x" } else { " " },
            file.name,
            file.size,
            file.uploaded,
            file.rows,
            if file.selected { "" } else { " (not selected)" }
        );
    }
    if !store.show_table() {
        println!("No files selected.");
        return Ok(());
    }
    println!("Rows:");
    for (pos, row) in report.rows.iter().enumerate() {
        let values: Vec<&str> = row.fields.iter().map(|(_, value)| *value).collect();
        println!(
            "  {:>4} {} {:<10} {} (year {}, value {}, grade {})  {}",
            pos + 1,
            if row.selected { "x" } else { " " },
            row.rarity.to_string(),
            row.score.total(),
            row.score.year,
            row.score.value,
            row.score.grading,
            values.join(" | ")
        );
    }
    println!(
        "Selected {} of {} row(s){}",
        report.selected_count,
        report.rows.len(),
        if report.all_selected { " (all)" } else { "" }
    );
    Ok(())
}

fn build_report<'a>(store: &'a RecordStore, fields: &FieldArgs) -> InspectReport<'a> {
    let rarity_fields = fields.rarity();
    let files = store
        .files()
        .iter()
        .enumerate()
        .map(|(idx, file)| FileSummary {
            index: idx + 1,
            name: &file.name,
            size: format_file_size(file.size),
            uploaded: format_upload_date(&file.uploaded_at),
            selected: file.selected,
            rows: file.records.len(),
        })
        .collect();
    let rows = store
        .table_rows()
        .map(|(file, row, record)| {
            let breakdown = score(record, &rarity_fields);
            RowSummary {
                file: file + 1,
                row: row + 1,
                selected: record.selected,
                rarity: breakdown.rarity(),
                score: breakdown,
                fields: record.names().zip(record.values()).collect(),
            }
        })
        .collect();
    InspectReport {
        headers: store.headers(),
        files,
        rows,
        all_selected: store.is_all_selected(),
        selected_count: store.selected_subset().len(),
    }
}
