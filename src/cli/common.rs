//! Shared clap argument groups for CLI commands.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use cardsheet::{CardFields, PageParams, RarityFields};

/// Input files plus the selection applied to them.
#[derive(Args, Debug)]
pub struct SelectionArgs {
    /// CSV files to ingest, in order; the first accepted file sets the columns.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// 1-based indices of the files to use, e.g. `1,3` (default: all).
    #[arg(long = "only", value_delimiter = ',')]
    pub file_indices: Vec<usize>,
    /// Rows of the merged table to select, e.g. `1..10,25,40..$` (default: all).
    #[arg(long)]
    pub rows: Option<String>,
}

/// Sheet and card measurements, in inches.
#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Card edge length.
    #[arg(long, default_value_t = 1.6)]
    pub card_size: f32,
    /// Gap between cards and around the grid.
    #[arg(long, default_value_t = 0.3)]
    pub margin: f32,
    /// Coloured bleed around each card.
    #[arg(long, default_value_t = 0.125)]
    pub bleed: f32,
    #[arg(long, default_value_t = 8.5)]
    pub sheet_width: f32,
    #[arg(long, default_value_t = 11.0)]
    pub sheet_height: f32,
    /// Records laid out per batch.
    #[arg(long, default_value_t = 20)]
    pub batch_size: usize,
}

impl From<PageArgs> for PageParams {
    fn from(value: PageArgs) -> PageParams {
        PageParams {
            card_size: value.card_size,
            margin: value.margin,
            bleed: value.bleed,
            sheet_width: value.sheet_width,
            sheet_height: value.sheet_height,
            cards_per_batch: value.batch_size,
        }
    }
}

/// Column names used for scoring and card text.
#[derive(Args, Debug, Clone)]
pub struct FieldArgs {
    /// Column holding the card title.
    #[arg(long, default_value = "name")]
    pub subject_field: String,
    #[arg(long, default_value = "year")]
    pub year_field: String,
    /// Column holding a monetary value.
    #[arg(long, default_value = "value")]
    pub value_field: String,
    /// Column holding a grade such as `MS65` or `PF70`.
    #[arg(long, default_value = "grading")]
    pub grading_field: String,
}

impl FieldArgs {
    pub fn rarity(&self) -> RarityFields {
        RarityFields {
            year: self.year_field.clone(),
            value: self.value_field.clone(),
            grading: self.grading_field.clone(),
        }
    }

    pub fn card(&self) -> CardFields {
        CardFields {
            subject: self.subject_field.clone(),
            year: self.year_field.clone(),
        }
    }
}

/// Output container for rendered sheets.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    /// One multi-page PDF.
    Pdf,
    /// One PNG per sheet in a directory.
    Png,
}
