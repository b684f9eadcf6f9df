use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, info};

use super::RenderError;
use super::raster::PageOutput;
use crate::layout::{PageParams, Side};

/// File name used when no output path is given.
pub const DEFAULT_OUTPUT_NAME: &str = "cards.pdf";

const POINTS_PER_INCH: f32 = 72.0;

/// Builds one PDF, one page per sheet, each page filled by its image.
///
/// Sheets are converted and compressed as they arrive, so only the encoded
/// streams stay in memory until [`PdfWriter::save`].
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    width_pt: f32,
    height_pt: f32,
}

impl PdfWriter {
    pub fn new(params: &PageParams) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            width_pt: params.sheet_width * POINTS_PER_INCH,
            height_pt: params.sheet_height * POINTS_PER_INCH,
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append a sheet as the next page.
    pub fn add_page(&mut self, page: RgbaImage) -> Result<(), RenderError> {
        let rgb = DynamicImage::ImageRgba8(page).into_rgb8();
        let (width, height) = rgb.dimensions();
        let mut xobject = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        );
        xobject.compress()?;
        let image_id = self.doc.add_object(xobject);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        self.width_pt.into(),
                        0.into(),
                        0.into(),
                        self.height_pt.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec!["Sheet".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), self.width_pt.into(), self.height_pt.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Sheet" => image_id },
            },
        });
        self.kids.push(page_id.into());
        debug!(page = self.kids.len(), width, height, "added PDF page");
        Ok(())
    }

    /// Finish the page tree and write the document; returns the page count.
    pub fn save(mut self, path: &Path) -> Result<usize, RenderError> {
        let count = self.kids.len();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count as i64,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        self.doc.save(path)?;
        info!(path = %path.display(), pages = count, "wrote PDF");
        Ok(count)
    }
}

impl PageOutput for PdfWriter {
    fn write_page(&mut self, _index: usize, _side: Side, page: RgbaImage) -> Result<(), RenderError> {
        self.add_page(page)
    }
}

/// Writes each sheet as `sheet_NNN_<side>.png` inside a directory.
pub struct PngWriter {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl PngWriter {
    pub fn new(dir: &Path) -> Result<Self, RenderError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    /// Paths written so far, in sheet order.
    pub fn into_paths(self) -> Vec<PathBuf> {
        info!(dir = %self.dir.display(), pages = self.written.len(), "wrote PNG sheets");
        self.written
    }
}

impl PageOutput for PngWriter {
    fn write_page(&mut self, index: usize, side: Side, page: RgbaImage) -> Result<(), RenderError> {
        let side = match side {
            Side::Front => "front",
            Side::Back => "back",
        };
        let target = self.dir.join(format!("sheet_{:03}_{}.png", index + 1, side));
        page.save(&target)?;
        self.written.push(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn blank_page() -> RgbaImage {
        ImageBuffer::from_pixel(17, 22, Rgba([0xff, 0xff, 0xff, 0xff]))
    }

    #[test]
    fn pdf_has_one_page_per_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_NAME);
        let mut writer = PdfWriter::new(&PageParams::default());
        for _ in 0..4 {
            writer.add_page(blank_page()).unwrap();
        }
        assert_eq!(writer.page_count(), 4);
        assert_eq!(writer.save(&path).unwrap(), 4);

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[test]
    fn page_images_are_compressed_on_arrival() {
        let mut writer = PdfWriter::new(&PageParams::default());
        writer
            .add_page(ImageBuffer::from_pixel(400, 400, Rgba([0xff, 0xff, 0xff, 0xff])))
            .unwrap();
        let image = writer
            .doc
            .objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .find(|stream| {
                stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice())
            })
            .unwrap();
        assert!(image.content.len() < 400 * 400 * 3 / 10);
        assert!(image.dict.get(b"Filter").is_ok());
    }

    #[test]
    fn pngs_are_named_by_sheet_and_side() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PngWriter::new(dir.path()).unwrap();
        writer.write_page(0, Side::Front, blank_page()).unwrap();
        writer.write_page(1, Side::Back, blank_page()).unwrap();
        let written = writer.into_paths();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["sheet_001_front.png", "sheet_002_back.png"]);
        assert!(written.iter().all(|p| p.is_file()));
    }
}
