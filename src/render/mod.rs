//! Drawing a [`LayoutPlan`] onto a render surface.
//!
//! [`draw_plan`] walks the plan and issues drawing commands to a
//! [`RenderSink`]. Sinks decide what a command means: the raster sink paints
//! pixels, tests record the calls.

mod pdf;
mod raster;

pub use pdf::{DEFAULT_OUTPUT_NAME, PdfWriter, PngWriter};
pub use raster::{GLYPH_HEIGHT, GLYPH_WIDTH, PageOutput, RasterOptions, RasterSink, TemplateSet};

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::layout::{LayoutPlan, PageParams, Rect, Sheet, Side};
use crate::rarity::{Rarity, RarityFields, classify};
use crate::store::Record;

/// Text height on the card, as a fraction of the card size.
const TEXT_SCALE: f32 = 0.09;
/// Inset of front-side text from the card edge, as a fraction of the card size.
const TEXT_INSET: f32 = 0.08;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("layout refers to record {index} but only {len} cards were supplied")]
    MissingRecord { index: usize, len: usize },
    #[error("failed to load template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Horizontal anchoring of a text run relative to its `x` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// A line of text positioned in sheet inches; `y` is the top of the glyphs.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub height: f32,
    /// Text beyond this width is clipped.
    pub max_width: f32,
    pub align: Align,
}

/// Drawing surface fed by [`draw_plan`].
pub trait RenderSink {
    fn begin_sheet(&mut self, sheet: &Sheet, params: &PageParams) -> Result<(), RenderError>;
    fn fill_rect(&mut self, rect: Rect, color: [u8; 3]) -> Result<(), RenderError>;
    fn draw_template(&mut self, rarity: Rarity, rect: Rect) -> Result<(), RenderError>;
    fn draw_text(&mut self, run: &TextRun) -> Result<(), RenderError>;
    fn end_sheet(&mut self) -> Result<(), RenderError>;
}

/// Field names printed on the front of each card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFields {
    pub subject: String,
    pub year: String,
}

impl Default for CardFields {
    fn default() -> Self {
        Self {
            subject: "name".to_string(),
            year: "year".to_string(),
        }
    }
}

/// A record paired with its computed rarity.
#[derive(Debug, Clone, Copy)]
pub struct Card<'a> {
    pub record: &'a Record,
    pub rarity: Rarity,
}

/// Classify every record of a subset, keeping subset order.
pub fn cards_for<'a>(records: &[&'a Record], fields: &RarityFields) -> Vec<Card<'a>> {
    records
        .iter()
        .map(|&record| Card {
            record,
            rarity: classify(record, fields),
        })
        .collect()
}

/// Issue the drawing commands for every sheet of `plan`.
pub fn draw_plan<S: RenderSink + ?Sized>(
    plan: &LayoutPlan,
    cards: &[Card<'_>],
    fields: &CardFields,
    sink: &mut S,
) -> Result<(), RenderError> {
    let params = &plan.params;
    for sheet in &plan.sheets {
        sink.begin_sheet(sheet, params)?;
        for cell in &sheet.cells {
            let card = cards.get(cell.record).ok_or(RenderError::MissingRecord {
                index: cell.record,
                len: cards.len(),
            })?;
            let rect = cell.card_rect(params);
            sink.fill_rect(cell.bleed_rect(params), card.rarity.color())?;
            sink.draw_template(card.rarity, rect)?;
            for run in card_text(sheet.side, card, cell.sequence, rect, fields) {
                sink.draw_text(&run)?;
            }
        }
        sink.end_sheet()?;
    }
    Ok(())
}

fn card_text(
    side: Side,
    card: &Card<'_>,
    sequence: usize,
    rect: Rect,
    fields: &CardFields,
) -> Vec<TextRun> {
    let height = rect.width * TEXT_SCALE;
    match side {
        Side::Front => {
            let inset = rect.width * TEXT_INSET;
            let line = |text: String, row: f32| TextRun {
                text,
                x: rect.x + inset,
                y: rect.y + inset + row * height * 1.5,
                height,
                max_width: rect.width - 2.0 * inset,
                align: Align::Left,
            };
            let subject = card.record.get_loose(&fields.subject).unwrap_or_default();
            let year = card.record.get_loose(&fields.year).unwrap_or_default();
            let mut number = line(format!("#{sequence}"), 0.0);
            number.y = rect.y + rect.height - inset - height;
            vec![line(subject.to_string(), 0.0), line(year.to_string(), 1.0), number]
        }
        Side::Back => vec![TextRun {
            text: sequence.to_string(),
            x: rect.x + rect.width / 2.0,
            y: rect.y + (rect.height - 2.0 * height) / 2.0,
            height: 2.0 * height,
            max_width: rect.width,
            align: Align::Center,
        }],
    }
}
