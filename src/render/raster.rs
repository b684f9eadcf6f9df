use std::collections::HashMap;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as PxRect;
use tracing::debug;

use super::{Align, RenderError, RenderSink, TextRun};
use crate::layout::{PageParams, Rect, Sheet, Side};
use crate::rarity::Rarity;

pub const GLYPH_WIDTH: usize = 5;
pub const GLYPH_HEIGHT: usize = 7;

const PAGE_BG: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
const CARD_FACE: Rgba<u8> = Rgba([0xfd, 0xfa, 0xf3, 0xff]);
const CARD_BORDER: Rgba<u8> = Rgba([0x7d, 0x6b, 0x54, 0xff]);
const TEXT: Rgba<u8> = Rgba([0x1f, 0x1b, 0x14, 0xff]);

/// Card background images keyed by rarity tier.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    images: HashMap<Rarity, RgbaImage>,
}

impl TemplateSet {
    /// Load `<tier>.png` for every tier found in `dir`; missing files are skipped.
    pub fn load(dir: &Path) -> Result<Self, RenderError> {
        let mut set = Self::default();
        for rarity in Rarity::ALL {
            let path = dir.join(format!("{}.png", rarity.template_key()));
            if !path.is_file() {
                debug!(path = %path.display(), "no template for tier");
                continue;
            }
            let image = image::open(&path)
                .map_err(|source| RenderError::Template {
                    path: path.clone(),
                    source,
                })?
                .to_rgba8();
            set.images.insert(rarity, image);
        }
        Ok(set)
    }

    pub fn insert(&mut self, rarity: Rarity, image: RgbaImage) {
        self.images.insert(rarity, image);
    }

    pub fn get(&self, rarity: Rarity) -> Option<&RgbaImage> {
        self.images.get(&rarity)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Options controlling raster output.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub dpi: u32,
    pub templates: TemplateSet,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            dpi: 150,
            templates: TemplateSet::default(),
        }
    }
}

/// Receives each sheet image as soon as it has been painted.
pub trait PageOutput {
    fn write_page(&mut self, index: usize, side: Side, page: RgbaImage) -> Result<(), RenderError>;
}

/// Keeps every sheet in memory, in drawing order.
impl PageOutput for Vec<RgbaImage> {
    fn write_page(&mut self, _index: usize, _side: Side, page: RgbaImage) -> Result<(), RenderError> {
        self.push(page);
        Ok(())
    }
}

/// Paints each sheet into an RGBA image and hands it to `O` when the sheet ends.
pub struct RasterSink<O> {
    dpi: u32,
    templates: TemplateSet,
    scaled: HashMap<(Rarity, u32, u32), RgbaImage>,
    current: Option<RgbaImage>,
    sheet: (usize, Side),
    output: O,
}

impl<O: PageOutput> RasterSink<O> {
    pub fn new(options: RasterOptions, output: O) -> Self {
        Self {
            dpi: options.dpi.clamp(72, 1200),
            templates: options.templates,
            scaled: HashMap::new(),
            current: None,
            sheet: (0, Side::Front),
            output,
        }
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn into_output(self) -> O {
        self.output
    }

    fn px(&self, inches: f32) -> i32 {
        (inches * self.dpi as f32).round() as i32
    }

    fn px_rect(&self, rect: Rect) -> (i32, i32, u32, u32) {
        let x = self.px(rect.x);
        let y = self.px(rect.y);
        let w = self.px(rect.x + rect.width) - x;
        let h = self.px(rect.y + rect.height) - y;
        (x, y, w.max(1) as u32, h.max(1) as u32)
    }

    fn page(&mut self) -> &mut RgbaImage {
        self.current
            .get_or_insert_with(|| ImageBuffer::from_pixel(1, 1, PAGE_BG))
    }
}

impl<O: PageOutput> RenderSink for RasterSink<O> {
    fn begin_sheet(&mut self, sheet: &Sheet, params: &PageParams) -> Result<(), RenderError> {
        let width = self.px(params.sheet_width).max(1) as u32;
        let height = self.px(params.sheet_height).max(1) as u32;
        debug!(sheet = sheet.index, side = ?sheet.side, width, height, "begin sheet");
        self.sheet = (sheet.index, sheet.side);
        self.current = Some(ImageBuffer::from_pixel(width, height, PAGE_BG));
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, color: [u8; 3]) -> Result<(), RenderError> {
        let (x, y, w, h) = self.px_rect(rect);
        let [r, g, b] = color;
        draw_filled_rect_mut(self.page(), PxRect::at(x, y).of_size(w, h), Rgba([r, g, b, 0xff]));
        Ok(())
    }

    fn draw_template(&mut self, rarity: Rarity, rect: Rect) -> Result<(), RenderError> {
        let (x, y, w, h) = self.px_rect(rect);
        let key = (rarity, w, h);
        if !self.scaled.contains_key(&key) {
            if let Some(source) = self.templates.get(rarity) {
                let resized = imageops::resize(source, w, h, FilterType::Triangle);
                self.scaled.insert(key, resized);
            }
        }
        match self.scaled.get(&key) {
            Some(template) => {
                let page = self
                    .current
                    .get_or_insert_with(|| ImageBuffer::from_pixel(1, 1, PAGE_BG));
                imageops::overlay(page, template, x as i64, y as i64);
            }
            None => {
                let area = PxRect::at(x, y).of_size(w, h);
                let page = self.page();
                draw_filled_rect_mut(page, area, CARD_FACE);
                draw_hollow_rect_mut(page, area, CARD_BORDER);
            }
        }
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun) -> Result<(), RenderError> {
        let height_px = self.px(run.height).max(GLYPH_HEIGHT as i32);
        let scale = (height_px as f32 / GLYPH_HEIGHT as f32).round().max(1.0) as u32;
        let advance = ((GLYPH_WIDTH + 1) as u32 * scale) as i32;
        let max_chars = (self.px(run.max_width) / advance).max(0) as usize;
        let glyphs: Vec<char> = run.text.chars().take(max_chars).collect();
        let text_width = glyphs.len() as i32 * advance - scale as i32;

        let x = match run.align {
            Align::Left => self.px(run.x),
            Align::Center => self.px(run.x) - text_width / 2,
        };
        let y = self.px(run.y);
        let page = self.page();
        for (idx, ch) in glyphs.into_iter().enumerate() {
            draw_glyph(page, x + idx as i32 * advance, y, ch, TEXT, scale);
        }
        Ok(())
    }

    fn end_sheet(&mut self) -> Result<(), RenderError> {
        if let Some(page) = self.current.take() {
            let (index, side) = self.sheet;
            self.output.write_page(index, side, page)?;
        }
        Ok(())
    }
}

fn draw_glyph(image: &mut RgbaImage, x: i32, y: i32, ch: char, color: Rgba<u8>, scale: u32) {
    let pattern = glyph_pattern(ch);
    for (row, bits) in pattern.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                let px = x + (col as i32 * scale as i32);
                let py = y + (row as i32 * scale as i32);
                draw_filled_rect_mut(image, PxRect::at(px, py).of_size(scale, scale), color);
            }
        }
    }
}

#[rustfmt::skip]
fn glyph_pattern(ch: char) -> [u8; GLYPH_HEIGHT] {
    match ch.to_ascii_uppercase() {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b10010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b01010, 0b01010, 0b00100, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '&' => [0b01100, 0b10010, 0b10100, 0b01000, 0b10101, 0b10010, 0b01101],
        '/' => [0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000, 0b00000],
        ':' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000],
        '#' => [0b01010, 0b11111, 0b01010, 0b01010, 0b11111, 0b01010, 0b01010],
        '\'' => [0b00100, 0b00100, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '"' => [0b01010, 0b01010, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00100, 0b01000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '+' => [0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000, 0b00000],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '$' => [0b00100, 0b01111, 0b10100, 0b01110, 0b00101, 0b11110, 0b00100],
        '%' => [0b11001, 0b11010, 0b00100, 0b01000, 0b10110, 0b00110, 0b00000],
        '?' => [0b01110, 0b10001, 0b00010, 0b00100, 0b00100, 0b00000, 0b00100],
        _ => [0; GLYPH_HEIGHT],
    }
}
