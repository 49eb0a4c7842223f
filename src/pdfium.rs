//! Page rasterization through Pdfium
//!
//! Pdfium bindings are not shareable across threads, so every page is
//! rendered up front while the library is bound and the renderer only hands
//! out the finished images.

use crate::document::{PageRenderer, PageSize};
use crate::raster::ImageSource;
use crate::PdfError;
use image::RgbImage;
use log::debug;
use pdfium_render::prelude::*;
use std::path::Path;

/// Default render resolution
pub const DEFAULT_DPI: u16 = 150;

#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    pages: Vec<RgbImage>,
}

impl PdfiumRenderer {
    /// Bind the Pdfium library at `library_path` and render every page of
    /// `pdf` at `dpi`
    pub fn render_document(library_path: &Path, pdf: &[u8], dpi: u16) -> Result<Self, PdfError> {
        let bindings = Pdfium::bind_to_library(library_path)
            .map_err(|e| PdfError::Render(format!("cannot load Pdfium: {}", e)))?;
        let pdfium = Pdfium::new(bindings);
        let doc = pdfium
            .load_pdf_from_byte_vec(pdf.to_vec(), None)
            .map_err(|e| PdfError::Render(e.to_string()))?;

        let dpi = dpi.max(72);
        let mut pages = Vec::new();
        for page in doc.pages().iter() {
            let width_pt = page.width().value.max(1.0);
            let target_width = ((width_pt / 72.0) * f32::from(dpi)).round() as i32;
            let config = PdfRenderConfig::new().set_target_width(target_width);
            let image = page
                .render_with_config(&config)
                .map_err(|e| PdfError::Render(e.to_string()))?
                .as_image()
                .into_rgb8();
            pages.push(image);
        }

        debug!("Rendered {} pages with Pdfium at {} dpi", pages.len(), dpi);
        Ok(Self { pages })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render(&self, page: u32, _size: PageSize) -> Result<Option<ImageSource>, PdfError> {
        let index = page.checked_sub(1).ok_or(PdfError::PageOutOfRange {
            page,
            page_count: self.pages.len() as u32,
        })?;
        Ok(self
            .pages
            .get(index as usize)
            .cloned()
            .map(ImageSource::Decoded))
    }
}
