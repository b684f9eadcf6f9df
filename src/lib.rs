//! Core library for turning CSV record files into printable rarity cards.

pub mod ingest;
pub mod layout;
pub mod parser;
pub mod rarity;
pub mod render;
pub mod schema;
pub mod store;

pub use ingest::{FileSource, IngestError, IngestReport, MemorySource, PathSource, ingest};
pub use layout::{
    Grid, LayoutCell, LayoutEngine, LayoutError, LayoutPlan, PageParams, Rect, Sheet, Side,
};
pub use parser::{ParsedTable, parse};
pub use rarity::{Rarity, RarityFields, RarityScore, classify, score};
pub use render::{
    Card, CardFields, PageOutput, PdfWriter, PngWriter, RasterOptions, RasterSink, RenderError,
    RenderSink, TemplateSet, cards_for, draw_plan,
};
pub use schema::HeaderSet;
pub use store::{Record, RecordStore, SourceFile, StoreError};

/// Plan and rasterize the store's selected subset.
///
/// Each sheet is handed to `output` as soon as it is painted, in print order.
pub fn render_selection<O: PageOutput>(
    store: &RecordStore,
    params: PageParams,
    rarity_fields: &RarityFields,
    card_fields: &CardFields,
    options: RasterOptions,
    output: O,
) -> anyhow::Result<(LayoutPlan, O)> {
    let subset = store.selected_subset();
    let cards = cards_for(&subset, rarity_fields);
    let plan = LayoutEngine::new(params)?.plan(cards.len());
    let mut sink = RasterSink::new(options, output);
    draw_plan(&plan, &cards, card_fields, &mut sink)?;
    Ok((plan, sink.into_output()))
}
