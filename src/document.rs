//! Document access for the summary pipeline
//!
//! The pipeline only talks to a [`DocumentSource`]: page text, highlight
//! annotation geometry, a page raster and text clipped to a rectangle. All
//! geometry crossing this seam is in page points with a top-left origin.

use crate::annotations::{highlight_annotations, media_box};
use crate::extractor::{extract_page_words, page_text_from_words, text_in_rect, TextItem};
use crate::raster::ImageSource;
use crate::PdfError;
use log::{debug, warn};
use lopdf::Document;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Axis-aligned rectangle in page points, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// True when the two rectangles share a region of positive area
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }
}

/// Four corner points of one highlighted line span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub points: [(f32, f32); 4],
}

impl Quad {
    pub fn bounding_rect(&self) -> Rect {
        let xs = self.points.iter().map(|p| p.0);
        let ys = self.points.iter().map(|p| p.1);
        let x0 = xs.clone().fold(f32::INFINITY, f32::min);
        let x1 = xs.fold(f32::NEG_INFINITY, f32::max);
        let y0 = ys.clone().fold(f32::INFINITY, f32::min);
        let y1 = ys.fold(f32::NEG_INFINITY, f32::max);
        Rect::new(x0, y0, x1, y1)
    }
}

/// A native highlight annotation; one annotation can span several lines
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightAnnotation {
    pub quads: Vec<Quad>,
}

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl Default for PageSize {
    /// US Letter
    fn default() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }
}

/// Read access to a paginated document. Page numbers are 1-based.
pub trait DocumentSource: Send + Sync {
    fn page_count(&self) -> u32;

    fn page_size(&self, page: u32) -> Result<PageSize, PdfError>;

    /// Raw page text, one text line per `\n`
    fn page_text(&self, page: u32) -> Result<String, PdfError>;

    fn highlight_annotations(&self, page: u32) -> Result<Vec<HighlightAnnotation>, PdfError>;

    /// Raster of the page, `None` when this source cannot produce one
    fn render_page(&self, page: u32) -> Result<Option<ImageSource>, PdfError>;

    /// Text layer content overlapping `rect`
    fn text_in_rect(&self, page: u32, rect: &Rect) -> Result<String, PdfError>;
}

/// Fail with [`PdfError::PageOutOfRange`] unless `page` is in `1..=page_count`
pub fn check_page(page: u32, page_count: u32) -> Result<(), PdfError> {
    if page == 0 || page > page_count {
        return Err(PdfError::PageOutOfRange { page, page_count });
    }
    Ok(())
}

/// Produces page rasters for a document
pub trait PageRenderer: Send + Sync {
    fn render(&self, page: u32, size: PageSize) -> Result<Option<ImageSource>, PdfError>;
}

/// Serves pre-rendered page images named `page-<n>.png` (or `.jpg`) from a directory
#[derive(Debug, Clone)]
pub struct ImageDirRenderer {
    dir: PathBuf,
}

impl ImageDirRenderer {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn candidates(&self, page: u32) -> [PathBuf; 3] {
        [
            self.dir.join(format!("page-{page}.png")),
            self.dir.join(format!("page-{page}.jpg")),
            self.dir.join(format!("page-{page}.jpeg")),
        ]
    }
}

impl PageRenderer for ImageDirRenderer {
    fn render(&self, page: u32, _size: PageSize) -> Result<Option<ImageSource>, PdfError> {
        for path in self.candidates(page) {
            if path.is_file() {
                debug!("Page {}: using page image {}", page, path.display());
                return Ok(Some(ImageSource::Bytes(std::fs::read(&path)?)));
            }
        }
        Ok(None)
    }
}

/// Everything the pipeline needs from one page, pulled out of lopdf at load time
#[derive(Debug)]
struct PageData {
    size: PageSize,
    origin: (f32, f32),
    words: Result<Vec<TextItem>, String>,
    annotations: Result<Vec<HighlightAnnotation>, String>,
}

/// [`DocumentSource`] backed by lopdf
///
/// Content streams and annotations are read once when the document is
/// loaded. A page whose content cannot be decoded keeps its error and reports
/// it when that page is asked for text, so one bad page does not fail the load.
pub struct LopdfDocument {
    pages: Vec<PageData>,
    renderer: Option<Box<dyn PageRenderer>>,
}

impl std::fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("pages", &self.pages.len())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

impl LopdfDocument {
    /// Load a PDF file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PdfError> {
        let doc = Document::load(path)?;
        Self::from_document(&doc)
    }

    /// Load a PDF from a memory buffer
    pub fn load_mem(buffer: &[u8]) -> Result<Self, PdfError> {
        let doc = Document::load_mem(buffer)?;
        Self::from_document(&doc)
    }

    pub fn from_document(doc: &Document) -> Result<Self, PdfError> {
        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        let mut pages = Vec::new();
        for (&page_num, &page_id) in doc.get_pages().iter() {
            let mbox = media_box(doc, page_id);
            let words = extract_page_words(doc, page_id, page_num).map_err(|e| {
                warn!("Page {}: text extraction failed: {}", page_num, e);
                e.to_string()
            });
            let annotations = highlight_annotations(doc, page_id, &mbox).map_err(|e| {
                warn!("Page {}: annotation lookup failed: {}", page_num, e);
                e.to_string()
            });
            pages.push(PageData {
                size: mbox.size(),
                origin: (mbox.x0, mbox.y1),
                words,
                annotations,
            });
        }

        if pages.is_empty() {
            return Err(PdfError::InvalidStructure);
        }

        Ok(Self {
            pages,
            renderer: None,
        })
    }

    /// Attach a page rasterizer, enabling color-based highlight detection
    pub fn with_renderer<R: PageRenderer + 'static>(mut self, renderer: R) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    fn page(&self, page: u32) -> Result<&PageData, PdfError> {
        check_page(page, self.page_count())?;
        Ok(&self.pages[(page - 1) as usize])
    }

    fn words(&self, page: u32) -> Result<&[TextItem], PdfError> {
        self.page(page)?
            .words
            .as_deref()
            .map_err(|e| PdfError::Parse(e.clone()))
    }
}

impl DocumentSource for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<PageSize, PdfError> {
        Ok(self.page(page)?.size)
    }

    fn page_text(&self, page: u32) -> Result<String, PdfError> {
        Ok(page_text_from_words(self.words(page)?))
    }

    fn highlight_annotations(&self, page: u32) -> Result<Vec<HighlightAnnotation>, PdfError> {
        self.page(page)?
            .annotations
            .clone()
            .map_err(PdfError::Parse)
    }

    fn render_page(&self, page: u32) -> Result<Option<ImageSource>, PdfError> {
        let size = self.page_size(page)?;
        match &self.renderer {
            Some(renderer) => renderer.render(page, size),
            None => Ok(None),
        }
    }

    fn text_in_rect(&self, page: u32, rect: &Rect) -> Result<String, PdfError> {
        let data = self.page(page)?;
        Ok(text_in_rect(self.words(page)?, rect, data.origin))
    }
}
