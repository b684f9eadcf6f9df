//! `cardsheet render`: draw the selected records as print-ready sheets.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use cardsheet::render::DEFAULT_OUTPUT_NAME;
use cardsheet::{
    PageParams, PdfWriter, PngWriter, RasterOptions, TemplateSet, render_selection,
};

use crate::cli::common::{FieldArgs, OutputFormatArg, PageArgs, SelectionArgs};
use crate::cli::utils::{apply_selection, load_store};

/// Directory used for `--format png` when no output is given.
const DEFAULT_PNG_DIR: &str = "cards";

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
    #[command(flatten)]
    pub page: PageArgs,
    #[command(flatten)]
    pub fields: FieldArgs,
    /// Output PDF file, or directory for PNG sheets.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    #[arg(long, default_value_t = OutputFormatArg::Pdf, value_enum)]
    pub format: OutputFormatArg,
    /// Dots per inch used when rasterising.
    #[arg(long, default_value_t = 150)]
    pub dpi: u32,
    /// Directory holding `common.png`, `uncommon.png`, `rare.png` and `ultra_rare.png`.
    #[arg(long)]
    pub templates: Option<PathBuf>,
}

pub fn handle(args: RenderArgs) -> Result<()> {
    let mut store = load_store(&args.selection)?;
    apply_selection(&mut store, &args.selection)?;
    if store.selected_subset().is_empty() {
        return Err(anyhow!("no records selected; nothing to render"));
    }

    let templates = match &args.templates {
        Some(dir) => TemplateSet::load(dir)
            .with_context(|| format!("failed to load templates from {}", dir.display()))?,
        None => TemplateSet::default(),
    };
    if args.templates.is_some() && templates.is_empty() {
        eprintln!("Warning: no template images found; drawing plain card faces");
    }
    let options = RasterOptions {
        dpi: args.dpi,
        templates,
    };

    let params: PageParams = args.page.into();
    let rarity_fields = args.fields.rarity();
    let card_fields = args.fields.card();

    match args.format {
        OutputFormatArg::Pdf => {
            let output = args
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_NAME));
            let writer = PdfWriter::new(&params);
            let (plan, writer) =
                render_selection(&store, params, &rarity_fields, &card_fields, options, writer)?;
            let pages = writer
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "Rendered {} card(s) on {} page(s) to {}",
                plan.cells().count() / 2,
                pages,
                output.display()
            );
        }
        OutputFormatArg::Png => {
            let output = args
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PNG_DIR));
            let writer = PngWriter::new(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            let (plan, writer) =
                render_selection(&store, params, &rarity_fields, &card_fields, options, writer)
                    .with_context(|| format!("failed to write sheets into {}", output.display()))?;
            println!(
                "Rendered {} card(s) as {} PNG sheet(s) in {}",
                plan.cells().count() / 2,
                writer.into_paths().len(),
                output.display()
            );
        }
    }
    Ok(())
}
