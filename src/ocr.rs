//! Highlight fragment recovery
//!
//! Each region is read through the document's text layer first. When that
//! comes back blank and a page image plus a [`TextRecognizer`] are available,
//! the region is cropped out of the image and recognized instead. Quads of
//! one annotation are joined into a single fragment.

use crate::document::DocumentSource;
use crate::raster::crop_region;
use crate::regions::{DetectionMethod, Region};
use crate::summary::PageIssue;
use crate::PdfError;
use image::RgbImage;
use log::{debug, warn};

/// Optical character recognition for image-only regions
pub trait TextRecognizer: Send + Sync {
    fn recognize_text(&self, image: &RgbImage) -> Result<String, PdfError>;
}

/// Inputs for recovering text from the regions of one page
pub struct FragmentReader<'a, D: DocumentSource + ?Sized> {
    pub doc: &'a D,
    pub page: u32,
    /// Image pixels per page point on each axis
    pub scale: (f32, f32),
    pub image: Option<&'a RgbImage>,
    pub recognizer: Option<&'a dyn TextRecognizer>,
}

impl<'a, D: DocumentSource + ?Sized> FragmentReader<'a, D> {
    /// One fragment per annotation (or per color region), in region order.
    /// Failures are recorded in `issues` and the affected region reads as blank.
    pub fn read(&self, regions: &[Region], issues: &mut Vec<PageIssue>) -> Vec<String> {
        let mut groups: Vec<(Option<usize>, Vec<String>)> = Vec::new();

        for region in regions {
            let key = match region.method {
                DetectionMethod::Annotation { annotation, .. } => Some(annotation),
                _ => None,
            };
            let text = self.region_text(region, issues);
            match groups.last_mut() {
                Some((Some(last), parts)) if key == Some(*last) => parts.push(text),
                _ => groups.push((key, vec![text])),
            }
        }

        let fragments: Vec<String> = groups
            .into_iter()
            .map(|(_, parts)| join_parts(&parts))
            .filter(|f| !f.is_empty())
            .collect();
        debug!(
            "Page {}: recovered {} fragments from {} regions",
            self.page,
            fragments.len(),
            regions.len()
        );
        fragments
    }

    fn region_text(&self, region: &Region, issues: &mut Vec<PageIssue>) -> String {
        let rect = region.to_page_rect(self.scale);
        match self.doc.text_in_rect(self.page, &rect) {
            Ok(text) if !text.trim().is_empty() => return text,
            Ok(_) => {}
            Err(e) => {
                warn!("Page {}: text layer unreadable for region: {}", self.page, e);
                issues.push(PageIssue::TextExtraction(e.to_string()));
            }
        }

        let (Some(image), Some(recognizer)) = (self.image, self.recognizer) else {
            return String::new();
        };
        let crop = crop_region(image, region);
        if crop.width() == 0 || crop.height() == 0 {
            return String::new();
        }
        match recognizer.recognize_text(&crop) {
            Ok(text) => text,
            Err(e) => {
                warn!("Page {}: OCR failed: {}", self.page, e);
                issues.push(PageIssue::Ocr(e.to_string()));
                String::new()
            }
        }
    }
}

/// Join the text of several quads, flattening line breaks
fn join_parts(parts: &[String]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{HighlightAnnotation, PageSize, Rect};
    use crate::raster::ImageSource;
    use image::Rgb;

    /// Text layer that only knows the text above y = 100
    struct HalfTextDoc;

    impl DocumentSource for HalfTextDoc {
        fn page_count(&self) -> u32 {
            1
        }
        fn page_size(&self, _page: u32) -> Result<PageSize, PdfError> {
            Ok(PageSize::default())
        }
        fn page_text(&self, _page: u32) -> Result<String, PdfError> {
            Ok(String::new())
        }
        fn highlight_annotations(&self, _page: u32) -> Result<Vec<HighlightAnnotation>, PdfError> {
            Ok(Vec::new())
        }
        fn render_page(&self, _page: u32) -> Result<Option<ImageSource>, PdfError> {
            Ok(None)
        }
        fn text_in_rect(&self, _page: u32, rect: &Rect) -> Result<String, PdfError> {
            if rect.y1 <= 100.0 {
                Ok(format!("text\nat {}", rect.y0))
            } else {
                Ok(String::new())
            }
        }
    }

    struct FixedRecognizer(Result<&'static str, &'static str>);

    impl TextRecognizer for FixedRecognizer {
        fn recognize_text(&self, _image: &RgbImage) -> Result<String, PdfError> {
            self.0
                .map(str::to_string)
                .map_err(|e| PdfError::Ocr(e.to_string()))
        }
    }

    fn region(y1: u32, y2: u32, method: DetectionMethod) -> Region {
        Region {
            x1: 10,
            y1,
            x2: 50,
            y2,
            method,
        }
    }

    fn annot(annotation: usize, quad: usize) -> DetectionMethod {
        DetectionMethod::Annotation { annotation, quad }
    }

    #[test]
    fn test_quads_of_one_annotation_joined() {
        let reader = FragmentReader {
            doc: &HalfTextDoc,
            page: 1,
            scale: (1.0, 1.0),
            image: None,
            recognizer: None,
        };
        let mut issues = Vec::new();
        let fragments = reader.read(
            &[
                region(10, 20, annot(0, 0)),
                region(30, 40, annot(0, 1)),
                region(50, 60, annot(1, 0)),
            ],
            &mut issues,
        );
        assert_eq!(fragments, vec!["text at 10 text at 30", "text at 50"]);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_color_regions_stay_separate() {
        let reader = FragmentReader {
            doc: &HalfTextDoc,
            page: 1,
            scale: (2.0, 2.0),
            image: None,
            recognizer: None,
        };
        let mut issues = Vec::new();
        let fragments = reader.read(
            &[
                region(20, 40, DetectionMethod::Color),
                region(60, 80, DetectionMethod::Color),
            ],
            &mut issues,
        );
        assert_eq!(fragments, vec!["text at 10", "text at 30"]);
    }

    #[test]
    fn test_blank_text_layer_falls_back_to_ocr() {
        let image = RgbImage::from_pixel(200, 400, Rgb([255, 255, 0]));
        let recognizer = FixedRecognizer(Ok("recognized words"));
        let reader = FragmentReader {
            doc: &HalfTextDoc,
            page: 1,
            scale: (1.0, 1.0),
            image: Some(&image),
            recognizer: Some(&recognizer),
        };
        let mut issues = Vec::new();
        let fragments = reader.read(&[region(200, 220, DetectionMethod::Color)], &mut issues);
        assert_eq!(fragments, vec!["recognized words"]);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_ocr_failure_recorded() {
        let image = RgbImage::new(200, 400);
        let recognizer = FixedRecognizer(Err("engine offline"));
        let reader = FragmentReader {
            doc: &HalfTextDoc,
            page: 1,
            scale: (1.0, 1.0),
            image: Some(&image),
            recognizer: Some(&recognizer),
        };
        let mut issues = Vec::new();
        let fragments = reader.read(&[region(200, 220, DetectionMethod::Color)], &mut issues);
        assert!(fragments.is_empty());
        assert!(matches!(issues.as_slice(), [PageIssue::Ocr(_)]));
    }

    #[test]
    fn test_blank_without_recognizer_dropped() {
        let reader = FragmentReader {
            doc: &HalfTextDoc,
            page: 1,
            scale: (1.0, 1.0),
            image: None,
            recognizer: None,
        };
        let mut issues = Vec::new();
        assert!(reader
            .read(&[region(200, 220, DetectionMethod::Color)], &mut issues)
            .is_empty());
        assert!(issues.is_empty());
    }
}
