//! Page and document summary assembly
//!
//! Per page: text → paragraphs and headings, regions → fragments → matches,
//! headings spliced in, statistics computed. Pages are independent, so the
//! document pass can fan out over rayon and still collect in page order.

use crate::document::{check_page, DocumentSource, PageSize};
use crate::headings::extract_structure;
use crate::matcher::{CandidatePolicy, HighlightMatcher};
use crate::merge::{merge_headings, PageStats, SummaryEntry};
use crate::ocr::{FragmentReader, TextRecognizer};
use crate::paragraphs::PageText;
use crate::raster::crop_region;
use crate::regions::{
    detect_color_regions, detect_figures, regions_from_annotations, FigureDetectorConfig, Region,
    RegionDetectorConfig,
};
use crate::similarity::{Scorer, TokenSortRatio};
use crate::PdfError;
use image::RgbImage;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;

/// Where highlight regions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionStrategy {
    /// Annotation geometry when the page has highlight annotations, color otherwise
    #[default]
    Auto,
    Annotations,
    Color,
}

#[derive(Debug, Clone)]
pub struct SummaryOptions {
    /// Minimum similarity (0-100) for a paragraph to count as highlighted
    pub threshold: u8,
    /// Collect figure candidates and captions
    pub include_images: bool,
    /// Pages to process, 1-based and inclusive; all pages when `None`
    pub page_range: Option<RangeInclusive<u32>>,
    pub region_strategy: RegionStrategy,
    pub candidates: CandidatePolicy,
    pub detector: RegionDetectorConfig,
    /// Process pages on the rayon pool
    pub parallel: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            threshold: 50,
            include_images: false,
            page_range: None,
            region_strategy: RegionStrategy::Auto,
            candidates: CandidatePolicy::AboveThreshold,
            detector: RegionDetectorConfig::default(),
            parallel: true,
        }
    }
}

/// A page-local failure that degraded the page instead of aborting the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PageIssue {
    TextExtraction(String),
    RegionDetection(String),
    /// Color detection was needed but no page image was available
    NoPageImage,
    Ocr(String),
}

impl fmt::Display for PageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageIssue::TextExtraction(e) => write!(f, "text extraction failed: {}", e),
            PageIssue::RegionDetection(e) => write!(f, "region detection failed: {}", e),
            PageIssue::NoPageImage => f.write_str("no page image for color detection"),
            PageIssue::Ocr(e) => write!(f, "text recognition failed: {}", e),
        }
    }
}

/// A figure candidate cut out of the page image
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub region: Region,
    #[serde(skip)]
    pub image: RgbImage,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub page: u32,
    /// Heading markers interleaved with highlights, in page order
    pub body: Vec<SummaryEntry>,
    pub headings: Vec<String>,
    pub captions: Vec<String>,
    pub figures: Vec<Figure>,
    pub stats: PageStats,
    pub issues: Vec<PageIssue>,
}

impl PageResult {
    /// Header, body, statistics and page break
    pub fn entries(&self) -> Vec<SummaryEntry> {
        let mut entries = Vec::with_capacity(self.body.len() + 3);
        entries.push(SummaryEntry::PageHeader(self.page));
        entries.extend(self.body.iter().cloned());
        entries.push(SummaryEntry::Stats(self.stats));
        entries.push(SummaryEntry::PageBreak);
        entries
    }

    pub fn highlights(&self) -> Vec<&str> {
        self.body
            .iter()
            .filter_map(|e| match e {
                SummaryEntry::Highlight(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// True when something failed on this page, as opposed to the page
    /// simply having no highlights
    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub page_count: u32,
    pub pages: Vec<PageResult>,
}

impl DocumentSummary {
    /// All page entries concatenated in page order
    pub fn entries(&self) -> Vec<SummaryEntry> {
        self.pages.iter().flat_map(PageResult::entries).collect()
    }

    pub fn degraded_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.is_degraded())
            .map(|p| p.page)
            .collect()
    }
}

/// Drives the per-page pipeline with a configurable scorer and optional OCR
pub struct Summarizer {
    options: SummaryOptions,
    scorer: Box<dyn Scorer>,
    recognizer: Option<Box<dyn TextRecognizer>>,
}

impl Summarizer {
    pub fn new(options: SummaryOptions) -> Self {
        Self {
            options,
            scorer: Box::new(TokenSortRatio),
            recognizer: None,
        }
    }

    pub fn with_scorer<S: Scorer + 'static>(mut self, scorer: S) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_recognizer<R: TextRecognizer + 'static>(mut self, recognizer: R) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    pub fn options(&self) -> &SummaryOptions {
        &self.options
    }

    /// Summarize one page. Only an invalid page number is an error; anything
    /// that goes wrong inside the page is recorded in [`PageResult::issues`].
    pub fn summarize_page<D: DocumentSource + ?Sized>(
        &self,
        doc: &D,
        page: u32,
    ) -> Result<PageResult, PdfError> {
        let page_count = doc.page_count();
        check_page(page, page_count)?;
        let mut issues = Vec::new();

        let raw = doc.page_text(page).unwrap_or_else(|e| {
            warn!("Page {}: text extraction failed: {}", page, e);
            issues.push(PageIssue::TextExtraction(e.to_string()));
            String::new()
        });
        let text = PageText::from_raw(&raw);
        let structure = extract_structure(&text.structural);
        debug!(
            "Page {}: {} paragraphs, {} headings, {} captions",
            page,
            text.len(),
            structure.headings.len(),
            structure.captions.len()
        );

        let page_size = doc.page_size(page).unwrap_or_else(|e| {
            debug!("Page {}: no page size ({}), assuming Letter", page, e);
            PageSize::default()
        });

        let annotations = if self.options.region_strategy == RegionStrategy::Color {
            Vec::new()
        } else {
            doc.highlight_annotations(page).unwrap_or_else(|e| {
                warn!("Page {}: annotations unreadable: {}", page, e);
                issues.push(PageIssue::RegionDetection(e.to_string()));
                Vec::new()
            })
        };
        let use_annotations = match self.options.region_strategy {
            RegionStrategy::Annotations => true,
            RegionStrategy::Color => false,
            RegionStrategy::Auto => !annotations.is_empty(),
        };

        // The image is needed for color detection and figures, and is
        // useful for OCR fallback when a recognizer is attached
        let image_required = !use_annotations || self.options.include_images;
        let image = if image_required || self.recognizer.is_some() {
            match page_image(doc, page) {
                Ok(Some(image)) => Some(image),
                Ok(None) => {
                    if image_required {
                        issues.push(PageIssue::NoPageImage);
                    }
                    None
                }
                Err(e) => {
                    warn!("Page {}: page image unusable: {}", page, e);
                    if image_required {
                        issues.push(PageIssue::RegionDetection(e.to_string()));
                    }
                    None
                }
            }
        } else {
            None
        };

        let (image_size, scale) = match &image {
            Some(img) => (
                img.dimensions(),
                (
                    img.width() as f32 / page_size.width.max(1.0),
                    img.height() as f32 / page_size.height.max(1.0),
                ),
            ),
            None => (
                (
                    page_size.width.ceil() as u32,
                    page_size.height.ceil() as u32,
                ),
                (1.0, 1.0),
            ),
        };

        let regions = if use_annotations {
            regions_from_annotations(&annotations, page_size, image_size)
        } else {
            match &image {
                Some(img) => detect_color_regions(img, &self.options.detector),
                None => Vec::new(),
            }
        };

        let reader = FragmentReader {
            doc,
            page,
            scale,
            image: image.as_ref(),
            recognizer: self.recognizer.as_deref(),
        };
        let fragments = reader.read(&regions, &mut issues);

        let matcher = HighlightMatcher::new(
            self.scorer.as_ref(),
            self.options.threshold,
            self.options.candidates,
        );
        let highlights = matcher.ordered_highlights(&fragments, &text);
        let body = merge_headings(&highlights, &structure.headings);

        let figures = match (&image, self.options.include_images) {
            (Some(img), true) => detect_figures(img, &FigureDetectorConfig::default())
                .into_iter()
                .map(|region| Figure {
                    image: crop_region(img, &region),
                    region,
                })
                .collect(),
            _ => Vec::new(),
        };

        let highlight_texts: Vec<&String> = body
            .iter()
            .filter_map(|e| match e {
                SummaryEntry::Highlight(text) => Some(text),
                _ => None,
            })
            .collect();
        let stats = PageStats {
            original_chars: text.char_count(),
            highlight_chars: highlight_texts.iter().map(|t| t.chars().count()).sum(),
            headings: structure.headings.len(),
            highlights: highlight_texts.len(),
        };

        info!(
            "Page {} of {}: extracted {} highlights from {} original characters and {} headings",
            page, page_count, stats.highlights, stats.original_chars, stats.headings
        );
        for issue in &issues {
            warn!("Page {} degraded: {}", page, issue);
        }

        Ok(PageResult {
            page,
            body,
            headings: structure.headings,
            captions: if self.options.include_images {
                structure.captions
            } else {
                Vec::new()
            },
            figures,
            stats,
            issues,
        })
    }

    /// Summarize the selected pages, in page order
    pub fn summarize_document<D: DocumentSource + ?Sized>(
        &self,
        doc: &D,
    ) -> Result<DocumentSummary, PdfError> {
        let page_count = doc.page_count();
        let pages = selected_pages(self.options.page_range.as_ref(), page_count)?;

        let results: Vec<PageResult> = if self.options.parallel {
            pages
                .par_iter()
                .map(|&page| self.summarize_page(doc, page))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            pages
                .iter()
                .map(|&page| self.summarize_page(doc, page))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(DocumentSummary {
            page_count,
            pages: results,
        })
    }
}

/// Summarize a document with the default scorer and no OCR
pub fn summarize_document<D: DocumentSource + ?Sized>(
    doc: &D,
    options: SummaryOptions,
) -> Result<DocumentSummary, PdfError> {
    Summarizer::new(options).summarize_document(doc)
}

fn page_image<D: DocumentSource + ?Sized>(
    doc: &D,
    page: u32,
) -> Result<Option<RgbImage>, PdfError> {
    match doc.render_page(page)? {
        Some(source) => source.decode().map(Some),
        None => Ok(None),
    }
}

/// Page numbers to process; range bounds outside the document are an error
fn selected_pages(
    range: Option<&RangeInclusive<u32>>,
    page_count: u32,
) -> Result<Vec<u32>, PdfError> {
    match range {
        None => Ok((1..=page_count).collect()),
        Some(range) => {
            let (start, end) = (*range.start(), *range.end());
            check_page(start, page_count)?;
            check_page(end, page_count)?;
            if start > end {
                return Err(PdfError::PageOutOfRange {
                    page: start,
                    page_count,
                });
            }
            Ok(range.clone().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_pages() {
        assert_eq!(selected_pages(None, 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(selected_pages(Some(&(2..=3)), 3).unwrap(), vec![2, 3]);
        assert!(selected_pages(None, 0).unwrap().is_empty());
    }

    #[test]
    fn test_selected_pages_out_of_range() {
        assert!(matches!(
            selected_pages(Some(&(2..=5)), 3),
            Err(PdfError::PageOutOfRange { page: 5, page_count: 3 })
        ));
        assert!(matches!(
            selected_pages(Some(&(0..=1)), 3),
            Err(PdfError::PageOutOfRange { page: 0, .. })
        ));
        assert!(matches!(
            selected_pages(Some(&(3..=2)), 3),
            Err(PdfError::PageOutOfRange { page: 3, .. })
        ));
    }

    #[test]
    fn test_entries_framing() {
        let result = PageResult {
            page: 4,
            body: vec![
                SummaryEntry::Heading("1.1 A".into()),
                SummaryEntry::Highlight("text".into()),
            ],
            headings: vec!["1.1 A".into()],
            captions: Vec::new(),
            figures: Vec::new(),
            stats: PageStats::default(),
            issues: Vec::new(),
        };
        let entries = result.entries();
        assert_eq!(entries.first(), Some(&SummaryEntry::PageHeader(4)));
        assert_eq!(entries.last(), Some(&SummaryEntry::PageBreak));
        assert!(matches!(entries[entries.len() - 2], SummaryEntry::Stats(_)));
        assert_eq!(result.highlights(), vec!["text"]);
        assert!(!result.is_degraded());
    }

    #[test]
    fn test_default_options() {
        let options = SummaryOptions::default();
        assert_eq!(options.threshold, 50);
        assert!(!options.include_images);
        assert!(options.parallel);
        assert_eq!(options.candidates, CandidatePolicy::AboveThreshold);
        assert_eq!(options.region_strategy, RegionStrategy::Auto);
    }

    #[test]
    fn test_issue_display() {
        assert_eq!(
            PageIssue::NoPageImage.to_string(),
            "no page image for color detection"
        );
        assert_eq!(
            PageIssue::Ocr("x".into()).to_string(),
            "text recognition failed: x"
        );
    }
}
