//! Highlight-only PDF summaries
//!
//! This crate provides:
//! - Highlight region detection, from native annotation geometry or from the
//!   highlighter color in a rendered page image
//! - Fuzzy reconciliation of highlight fragments against the page's body text
//! - Heading injection that keeps the summary in document order

pub mod annotations;
pub mod document;
pub mod extractor;
pub mod headings;
pub mod markdown;
pub mod matcher;
pub mod merge;
pub mod ocr;
pub mod paragraphs;
#[cfg(feature = "pdfium")]
pub mod pdfium;
pub mod raster;
pub mod regions;
pub mod session;
pub mod similarity;
pub mod summary;

pub use document::{DocumentSource, ImageDirRenderer, LopdfDocument, PageRenderer, Rect};
pub use matcher::{CandidatePolicy, HighlightMatcher, Match};
pub use merge::{merge_headings, PageStats, SummaryEntry};
pub use raster::ImageSource;
pub use regions::{DetectionMethod, Region, RegionDetectorConfig};
pub use summary::{
    summarize_document, DocumentSummary, PageIssue, PageResult, RegionStrategy, SummaryOptions,
    Summarizer,
};

use std::path::Path;

/// Summarize a PDF file with the default text-layer document backend
///
/// Pages without highlight annotations need a page image for color
/// detection; attach a renderer through [`LopdfDocument::with_renderer`] and
/// call [`summarize_document`] directly when that matters.
pub fn summarize_pdf<P: AsRef<Path>>(
    path: P,
    options: SummaryOptions,
) -> Result<DocumentSummary, PdfError> {
    let doc = LopdfDocument::load(path)?;
    summarize_document(&doc, options)
}

/// Summarize a PDF held in memory
pub fn summarize_pdf_mem(
    buffer: &[u8],
    options: SummaryOptions,
) -> Result<DocumentSummary, PdfError> {
    let doc = LopdfDocument::load_mem(buffer)?;
    summarize_document(&doc, options)
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("Invalid PDF structure")]
    InvalidStructure,
    #[error("Unsupported image format: {0}")]
    InvalidImageFormat(String),
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("Page rendering failed: {0}")]
    Render(String),
    #[error("Text recognition failed: {0}")]
    Ocr(String),
    #[error("Session state error: {0}")]
    Session(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Parse(e.to_string())
    }
}

impl From<image::ImageError> for PdfError {
    fn from(e: image::ImageError) -> Self {
        PdfError::InvalidImageFormat(e.to_string())
    }
}
