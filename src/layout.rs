//! Card placement on double-sided print sheets.
//!
//! Layout is pure geometry: the engine turns a record count and page
//! parameters into sheets of [`LayoutCell`]s without touching any drawing
//! surface. All measurements are in inches.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Absorbs float noise when a dimension divides exactly into whole cards.
const FIT_EPSILON: f32 = 1e-4;

/// Physical sheet and card measurements for one layout run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageParams {
    pub card_size: f32,
    pub margin: f32,
    pub bleed: f32,
    pub sheet_width: f32,
    pub sheet_height: f32,
    pub cards_per_batch: usize,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            card_size: 1.6,
            margin: 0.3,
            bleed: 0.125,
            sheet_width: 8.5,
            sheet_height: 11.0,
            cards_per_batch: 20,
        }
    }
}

impl PageParams {
    fn pitch(&self) -> f32 {
        self.card_size + self.margin
    }

    fn fit(&self, extent: f32) -> usize {
        let count = ((extent - self.margin) / self.pitch() + FIT_EPSILON).floor();
        if count.is_finite() && count > 0.0 {
            count as usize
        } else {
            0
        }
    }

    /// Width of a row holding `cards` cards, from first left edge to last right edge.
    pub fn row_width(&self, cards: usize) -> f32 {
        if cards == 0 {
            return 0.0;
        }
        cards as f32 * self.card_size + (cards - 1) as f32 * self.margin
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("page parameters must be finite and positive (card size {card_size}, margin {margin})")]
    InvalidDimensions { card_size: f32, margin: f32 },
    #[error("a {card_size}in card does not fit on a {sheet_width}x{sheet_height}in sheet")]
    ZeroCapacity {
        card_size: f32,
        sheet_width: f32,
        sheet_height: f32,
    },
    #[error("cards per batch must be at least 1")]
    EmptyBatch,
}

/// Cards per row and per column for a given set of page parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub cards_per_row: usize,
    pub cards_per_col: usize,
}

impl Grid {
    pub fn for_params(params: &PageParams) -> Self {
        Self {
            cards_per_row: params.fit(params.sheet_width),
            cards_per_col: params.fit(params.sheet_height),
        }
    }

    pub fn cards_per_sheet(&self) -> usize {
        self.cards_per_row.saturating_mul(self.cards_per_col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

/// One placed card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutCell {
    pub batch: usize,
    /// Index of the sheet within the whole document.
    pub sheet: usize,
    /// Index of the page within its batch; a front and its back share it.
    pub page: usize,
    pub side: Side,
    pub row: usize,
    pub column: usize,
    pub x: f32,
    pub y: f32,
    /// Index into the record subset handed to [`LayoutEngine::plan`].
    pub record: usize,
    /// 1-based number printed on the card.
    pub sequence: usize,
}

/// Axis-aligned rectangle in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutCell {
    pub fn card_rect(&self, params: &PageParams) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: params.card_size,
            height: params.card_size,
        }
    }

    pub fn bleed_rect(&self, params: &PageParams) -> Rect {
        let size = params.card_size + 2.0 * params.bleed;
        Rect {
            x: self.x - params.bleed,
            y: self.y - params.bleed,
            width: size,
            height: size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub index: usize,
    pub batch: usize,
    pub page: usize,
    pub side: Side,
    pub cells: Vec<LayoutCell>,
}

/// Every sheet of one layout run, in print order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutPlan {
    pub params: PageParams,
    pub grid: Grid,
    pub sheets: Vec<Sheet>,
}

impl LayoutPlan {
    pub fn cells(&self) -> impl Iterator<Item = &LayoutCell> {
        self.sheets.iter().flat_map(|s| s.cells.iter())
    }

    pub fn batch_count(&self) -> usize {
        self.sheets.last().map(|s| s.batch + 1).unwrap_or(0)
    }

    /// SHA-256 over the serialized sheets; equal plans hash equally.
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        let mut hasher = Sha256::new();
        let mut buffer = Vec::new();
        for sheet in &self.sheets {
            serde_json::to_writer(&mut buffer, sheet)?;
            hasher.update(&buffer);
            buffer.clear();
        }
        let digest = hasher.finalize();
        Ok(format!("{digest:02x}"))
    }
}

/// Validated layout engine for one set of page parameters.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    params: PageParams,
    grid: Grid,
}

impl LayoutEngine {
    pub fn new(params: PageParams) -> Result<Self, LayoutError> {
        let dims = [
            params.card_size,
            params.sheet_width,
            params.sheet_height,
        ];
        if dims.iter().any(|d| !d.is_finite() || *d <= 0.0)
            || !params.margin.is_finite()
            || params.margin < 0.0
            || !params.bleed.is_finite()
            || params.bleed < 0.0
        {
            return Err(LayoutError::InvalidDimensions {
                card_size: params.card_size,
                margin: params.margin,
            });
        }
        if params.cards_per_batch == 0 {
            return Err(LayoutError::EmptyBatch);
        }
        let grid = Grid::for_params(&params);
        if grid.cards_per_row.checked_mul(grid.cards_per_col).is_none() {
            return Err(LayoutError::InvalidDimensions {
                card_size: params.card_size,
                margin: params.margin,
            });
        }
        if grid.cards_per_sheet() == 0 {
            return Err(LayoutError::ZeroCapacity {
                card_size: params.card_size,
                sheet_width: params.sheet_width,
                sheet_height: params.sheet_height,
            });
        }
        Ok(Self { params, grid })
    }

    pub fn params(&self) -> &PageParams {
        &self.params
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Lay out `count` records, in order, onto front and back sheets.
    ///
    /// Records are grouped into batches of `cards_per_batch`. Each batch emits
    /// all of its front sheets and then one back sheet per front sheet.
    pub fn plan(&self, count: usize) -> LayoutPlan {
        let per_sheet = self.grid.cards_per_sheet();
        let mut sheets = Vec::new();

        for (batch, batch_start) in (0..count).step_by(self.params.cards_per_batch).enumerate() {
            let batch_len = self.params.cards_per_batch.min(count - batch_start);
            let pages = batch_len.div_ceil(per_sheet);

            for side in [Side::Front, Side::Back] {
                for page in 0..pages {
                    let page_start = page * per_sheet;
                    let on_page = per_sheet.min(batch_len - page_start);
                    let cells = (0..on_page)
                        .map(|slot| {
                            let record = batch_start + page_start + slot;
                            let mut cell = self.place(side, slot, on_page, record);
                            cell.batch = batch;
                            cell.page = page;
                            cell.sheet = sheets.len();
                            cell
                        })
                        .collect();
                    sheets.push(Sheet {
                        index: sheets.len(),
                        batch,
                        page,
                        side,
                        cells,
                    });
                }
            }
        }

        debug!(
            records = count,
            cards_per_row = self.grid.cards_per_row,
            cards_per_col = self.grid.cards_per_col,
            sheets = sheets.len(),
            "layout planned"
        );
        LayoutPlan {
            params: self.params,
            grid: self.grid,
            sheets,
        }
    }

    /// Position of the `slot`-th card of a page holding `on_page` cards.
    fn place(&self, side: Side, slot: usize, on_page: usize, record: usize) -> LayoutCell {
        let p = &self.params;
        let per_row = self.grid.cards_per_row;
        let row = slot / per_row;
        let front_col = slot % per_row;
        let y = p.margin + row as f32 * p.pitch();

        let (column, x) = match side {
            Side::Front => (front_col, p.margin + front_col as f32 * p.pitch()),
            Side::Back => {
                let row_len = per_row.min(on_page - row * per_row);
                let column = row_len - 1 - front_col;
                let x_offset = p.sheet_width - p.row_width(row_len) - p.margin;
                (column, x_offset + column as f32 * p.pitch())
            }
        };

        LayoutCell {
            batch: 0,
            sheet: 0,
            page: 0,
            side,
            row,
            column,
            x,
            y,
            record,
            sequence: record + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn engine() -> LayoutEngine {
        LayoutEngine::new(PageParams::default()).unwrap()
    }

    #[test]
    fn letter_sheet_grid() {
        let grid = engine().grid();
        assert_eq!(grid.cards_per_row, 4);
        assert_eq!(grid.cards_per_col, 5);
        assert_eq!(grid.cards_per_sheet(), 20);
    }

    #[test]
    fn grid_follows_parameters() {
        let params = PageParams {
            card_size: 2.5,
            margin: 0.25,
            ..PageParams::default()
        };
        let grid = LayoutEngine::new(params).unwrap().grid();
        assert_eq!(grid.cards_per_row, 3);
        assert_eq!(grid.cards_per_col, 3);
    }

    #[test]
    fn exact_fit_is_not_lost_to_rounding() {
        // (2.2 - 0.1) / (0.6 + 0.1) is exactly 3
        let params = PageParams {
            card_size: 0.6,
            margin: 0.1,
            sheet_width: 2.2,
            sheet_height: 2.2,
            ..PageParams::default()
        };
        assert_eq!(Grid::for_params(&params).cards_per_row, 3);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let too_big = PageParams {
            card_size: 9.0,
            ..PageParams::default()
        };
        assert!(matches!(
            LayoutEngine::new(too_big),
            Err(LayoutError::ZeroCapacity { .. })
        ));
        let no_batch = PageParams {
            cards_per_batch: 0,
            ..PageParams::default()
        };
        assert_eq!(LayoutEngine::new(no_batch).unwrap_err(), LayoutError::EmptyBatch);
        let negative = PageParams {
            margin: -0.1,
            ..PageParams::default()
        };
        assert!(matches!(
            LayoutEngine::new(negative),
            Err(LayoutError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn microscopic_cards_are_rejected_not_overflowed() {
        let params = PageParams {
            card_size: 1e-20,
            margin: 0.0,
            ..PageParams::default()
        };
        assert!(matches!(
            LayoutEngine::new(params),
            Err(LayoutError::InvalidDimensions { .. })
        ));
        let grid = Grid {
            cards_per_row: usize::MAX,
            cards_per_col: 2,
        };
        assert_eq!(grid.cards_per_sheet(), usize::MAX);
    }

    #[test]
    fn empty_subset_has_no_sheets() {
        let plan = engine().plan(0);
        assert!(plan.sheets.is_empty());
        assert_eq!(plan.batch_count(), 0);
    }

    #[test]
    fn twenty_five_records_make_two_batches() {
        let plan = engine().plan(25);
        let sides: Vec<(usize, Side, usize)> = plan
            .sheets
            .iter()
            .map(|s| (s.batch, s.side, s.cells.len()))
            .collect();
        assert_eq!(
            sides,
            vec![
                (0, Side::Front, 20),
                (0, Side::Back, 20),
                (1, Side::Front, 5),
                (1, Side::Back, 5),
            ]
        );
        assert_eq!(plan.batch_count(), 2);
        assert_eq!(plan.cells().count(), 50);
    }

    #[test]
    fn front_is_row_major_and_left_aligned() {
        let plan = engine().plan(20);
        let front = &plan.sheets[0];
        let cell = front.cells[6];
        assert_eq!((cell.row, cell.column), (1, 2));
        assert!(close(cell.x, 0.3 + 2.0 * 1.9));
        assert!(close(cell.y, 0.3 + 1.0 * 1.9));
        assert_eq!(cell.sequence, 7);
    }

    #[test]
    fn full_back_row_is_mirrored() {
        let plan = engine().plan(20);
        let back = &plan.sheets[1];
        assert_eq!(back.side, Side::Back);
        let first = back.cells[0];
        assert_eq!((first.row, first.column, first.record), (0, 3, 0));
        assert!(close(first.x, 8.5 - 0.3 - 1.6));
        let last_in_row = back.cells[3];
        assert_eq!(last_in_row.column, 0);
        // right-aligned: the 7.3in row ends one margin short of the right edge
        assert!(close(last_in_row.x, 0.9));
    }

    #[test]
    fn short_row_on_back_is_right_aligned() {
        let plan = engine().plan(25);
        let front = &plan.sheets[2];
        let back = &plan.sheets[3];

        // batch two holds five cards: one full row of four, then one card
        let front_cols: Vec<(usize, usize)> =
            front.cells.iter().map(|c| (c.row, c.column)).collect();
        assert_eq!(front_cols, vec![(0, 0), (0, 1), (0, 2), (0, 3), (1, 0)]);
        assert!(close(front.cells[4].x, 0.3));

        let lone = back.cells[4];
        assert_eq!((lone.row, lone.column, lone.record), (1, 0, 24));
        assert!(close(lone.x, 8.5 - 1.6 - 0.3));
        assert!(close(lone.y, front.cells[4].y));
    }

    #[test]
    fn back_positions_mirror_front_about_vertical_axis() {
        let params = PageParams::default();
        let plan = engine().plan(7);
        let front = &plan.sheets[0];
        let back = &plan.sheets[1];
        for (f, b) in front.cells.iter().zip(&back.cells) {
            assert_eq!(f.record, b.record);
            assert_eq!(f.row, b.row);
            assert!(
                close(b.x, params.sheet_width - f.x - params.card_size),
                "record {}",
                f.record
            );
        }
    }

    #[test]
    fn pages_split_within_a_batch() {
        let params = PageParams {
            cards_per_batch: 45,
            ..PageParams::default()
        };
        let plan = LayoutEngine::new(params).unwrap().plan(45);
        let layout: Vec<(Side, usize, usize)> = plan
            .sheets
            .iter()
            .map(|s| (s.side, s.page, s.cells.len()))
            .collect();
        assert_eq!(
            layout,
            vec![
                (Side::Front, 0, 20),
                (Side::Front, 1, 20),
                (Side::Front, 2, 5),
                (Side::Back, 0, 20),
                (Side::Back, 1, 20),
                (Side::Back, 2, 5),
            ]
        );
        assert_eq!(plan.sheets[5].cells[0].record, 40);
        assert!(plan.sheets.iter().enumerate().all(|(i, s)| s.index == i));
    }

    #[test]
    fn bleed_rect_surrounds_card() {
        let params = PageParams::default();
        let cell = engine().plan(1).sheets[0].cells[0];
        let bleed = cell.bleed_rect(&params);
        assert!(close(bleed.x, 0.3 - 0.125));
        assert!(close(bleed.width, 1.6 + 0.25));
        assert_eq!(cell.card_rect(&params).width, 1.6);
    }

    #[test]
    fn plans_are_reproducible() {
        let a = engine().plan(33);
        let b = engine().plan(33);
        assert_eq!(a, b);
        let print = a.fingerprint().unwrap();
        assert_eq!(print, b.fingerprint().unwrap());
        assert_ne!(print, engine().plan(32).fingerprint().unwrap());
        assert_eq!(print.len(), 64);
    }
}
